//! Configuration module for ssl-checks
//!
//! Handles loading settings from TOML files.

pub mod settings;

pub use settings::{ConnectionSettings, HstsSettings, RatingSettings, Settings};

use crate::utils::ConfigError;
use std::path::Path;

/// Load settings from `path` when given, else from the default location
pub fn load_settings<P: AsRef<Path>>(path: Option<P>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load_default(),
    }
}
