//! HSTS preload status and preloadability checks

use crate::checks::hsts::evaluate_status;
use crate::checks::{HstsClient, HstsStatus, HttpFetch};
use crate::config::HstsSettings;
use crate::models::Verdict;
use crate::utils::{CheckError, ConfigError};
use tracing::warn;

pub const STATUS_CHECK_NAME: &str = "CheckSSLHSTSStatus";
pub const PRELOADABLE_CHECK_NAME: &str = "CheckSSLHSTSPreloadable";

const BAD_RESPONSE: &str = "Bad response received from API";

#[derive(Debug, Clone)]
pub struct HstsStatusOptions {
    pub domain: String,
    pub api_url: Option<String>,
    pub warn: String,
    pub critical: String,
}

impl HstsStatusOptions {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            api_url: None,
            warn: HstsStatus::Pending.to_string(),
            critical: HstsStatus::Unknown.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HstsPreloadableOptions {
    pub domain: String,
    pub api_url: Option<String>,
}

pub async fn run_status(
    options: HstsStatusOptions,
    settings: &HstsSettings,
    http: &dyn HttpFetch,
) -> Verdict {
    let (warning, critical) = match status_levels(&options) {
        Ok(levels) => levels,
        Err(e) => return Verdict::from(CheckError::from(e)),
    };
    let api_url = options.api_url.as_deref().unwrap_or(&settings.status_api_url);

    match HstsClient::new(http).status(api_url, &options.domain).await {
        Ok(raw) => match raw.parse::<HstsStatus>() {
            Ok(status) => evaluate_status(status, warning, critical),
            Err(_) => Verdict::warning(format!("Invalid status returned {}", raw)),
        },
        Err(CheckError::Config(e)) => Verdict::from(CheckError::from(e)),
        Err(e) => {
            warn!(error = %e, "HSTS status lookup failed");
            Verdict::warning(BAD_RESPONSE)
        }
    }
}

fn status_levels(options: &HstsStatusOptions) -> Result<(HstsStatus, HstsStatus), ConfigError> {
    Ok((options.warn.parse()?, options.critical.parse()?))
}

pub async fn run_preloadable(
    options: HstsPreloadableOptions,
    settings: &HstsSettings,
    http: &dyn HttpFetch,
) -> Verdict {
    let api_url = options
        .api_url
        .as_deref()
        .unwrap_or(&settings.preloadable_api_url);

    match HstsClient::new(http).preloadable(api_url, &options.domain).await {
        Ok(report) => report.verdict(&options.domain),
        Err(CheckError::Config(e)) => Verdict::from(CheckError::from(e)),
        Err(e) => {
            warn!(error = %e, "HSTS preloadable lookup failed");
            Verdict::warning(BAD_RESPONSE)
        }
    }
}
