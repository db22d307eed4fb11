//! Application settings configuration
//!
//! Defines connection timeouts, rating API and HSTS API settings.

use crate::utils::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Transport and TLS timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub connect_timeout_secs: u64,
    pub handshake_timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            handshake_timeout_secs: 10,
        }
    }
}

impl ConnectionSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

/// SSL Labs rating API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    pub api_url: String,
    /// Number of checks before giving up
    pub max_attempts: u32,
    /// Minimum seconds between checks
    pub between_checks_secs: u64,
    /// Overall deadline for the whole poll, in seconds
    pub timeout_secs: u64,
    pub max_redirects: usize,
}

fn default_max_redirects() -> usize {
    10
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.ssllabs.com/api/v3/".to_string(),
            max_attempts: 24,
            between_checks_secs: 10,
            timeout_secs: 300,
            max_redirects: default_max_redirects(),
        }
    }
}

impl RatingSettings {
    pub fn between_checks(&self) -> Duration {
        Duration::from_secs(self.between_checks_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// hstspreload.org API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HstsSettings {
    pub status_api_url: String,
    pub preloadable_api_url: String,
    pub max_redirects: usize,
    pub timeout_secs: u64,
}

impl Default for HstsSettings {
    fn default() -> Self {
        Self {
            status_api_url: "https://hstspreload.org/api/v2/status".to_string(),
            preloadable_api_url: "https://hstspreload.org/api/v2/preloadable".to_string(),
            max_redirects: default_max_redirects(),
            timeout_secs: 30,
        }
    }
}

impl HstsSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub rating: RatingSettings,
    #[serde(default)]
    pub hsts: HstsSettings,
}

impl Settings {
    /// Load settings from the default config file
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_path = Path::new("config/default.toml");
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse settings from TOML text; missing sections take their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }
}
