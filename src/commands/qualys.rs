//! SSL Labs rating check

use crate::checks::rating::evaluate_grade;
use crate::checks::{GradeThresholds, HttpFetch, RatingConfig, RatingPoller};
use crate::config::RatingSettings;
use crate::models::{Grade, Verdict};
use crate::utils::{CheckError, Clock, ConfigError};
use std::sync::Arc;

pub const CHECK_NAME: &str = "CheckSSLQualys";

#[derive(Debug, Clone)]
pub struct QualysOptions {
    pub domain: String,
    pub api_url: Option<String>,
    pub warn: String,
    pub critical: String,
    pub num_checks: Option<u32>,
    pub between_checks: Option<u64>,
    pub timeout: Option<u64>,
}

impl QualysOptions {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            api_url: None,
            warn: Grade::AMinus.to_string(),
            critical: Grade::B.to_string(),
            num_checks: None,
            between_checks: None,
            timeout: None,
        }
    }

    /// Settings with command-line overrides applied
    fn rating_settings(&self, defaults: &RatingSettings) -> RatingSettings {
        RatingSettings {
            api_url: self.api_url.clone().unwrap_or_else(|| defaults.api_url.clone()),
            max_attempts: self.num_checks.unwrap_or(defaults.max_attempts),
            between_checks_secs: self.between_checks.unwrap_or(defaults.between_checks_secs),
            timeout_secs: self.timeout.unwrap_or(defaults.timeout_secs),
            max_redirects: defaults.max_redirects,
        }
    }
}

pub struct QualysCheck {
    domain: String,
    thresholds: GradeThresholds,
    poller: RatingPoller,
}

impl QualysCheck {
    pub fn new(
        options: QualysOptions,
        settings: &RatingSettings,
        http: Arc<dyn HttpFetch>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let thresholds = GradeThresholds::new(options.warn.parse()?, options.critical.parse()?)?;
        let config = RatingConfig::from_settings(&options.rating_settings(settings))?;

        Ok(Self {
            domain: options.domain,
            thresholds,
            poller: RatingPoller::new(http, clock, config),
        })
    }

    pub async fn run(&self) -> Verdict {
        match self.poller.rate(&self.domain).await {
            Ok(grade) => evaluate_grade(&self.domain, grade, &self.thresholds),
            Err(e) => Verdict::from(e),
        }
    }
}

pub async fn run(
    options: QualysOptions,
    settings: &RatingSettings,
    http: Arc<dyn HttpFetch>,
    clock: Arc<dyn Clock>,
) -> Verdict {
    match QualysCheck::new(options, settings, http, clock) {
        Ok(check) => check.run().await,
        Err(e) => Verdict::from(CheckError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_over_settings() {
        let options = QualysOptions {
            num_checks: Some(3),
            ..QualysOptions::new("example.com")
        };
        let settings = options.rating_settings(&RatingSettings::default());
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.between_checks_secs, 10);
        assert_eq!(settings.timeout_secs, 300);
    }
}
