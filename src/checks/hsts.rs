//! HSTS preload list lookups against the hstspreload.org API

use super::http::HttpFetch;
use crate::models::{Status, Verdict};
use crate::utils::{CheckError, ConfigError};
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// Preload status, least preloaded first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HstsStatus {
    Unknown,
    Pending,
    Preloaded,
}

impl HstsStatus {
    pub const ALL: [HstsStatus; 3] = [HstsStatus::Unknown, HstsStatus::Pending, HstsStatus::Preloaded];

    pub fn as_str(&self) -> &'static str {
        match self {
            HstsStatus::Unknown => "unknown",
            HstsStatus::Pending => "pending",
            HstsStatus::Preloaded => "preloaded",
        }
    }
}

impl FromStr for HstsStatus {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "status".to_string(),
                message: format!("{} is not one of unknown, pending, preloaded", s),
            })
    }
}

impl std::fmt::Display for HstsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `status` at or below `critical` is CRITICAL, at or below `warning` WARNING
pub fn evaluate_status(status: HstsStatus, warning: HstsStatus, critical: HstsStatus) -> Verdict {
    let level = if status <= critical {
        Status::Critical
    } else if status <= warning {
        Status::Warning
    } else {
        Status::Ok
    };
    Verdict::new(level, status.as_str())
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

/// One finding of the preloadable API
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadIssue {
    #[serde(default)]
    pub code: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Errors and warnings returned for a domain
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreloadableReport {
    #[serde(default)]
    pub errors: Vec<PreloadIssue>,
    #[serde(default)]
    pub warnings: Vec<PreloadIssue>,
}

impl PreloadableReport {
    pub fn verdict(&self, domain: &str) -> Verdict {
        let summaries = |issues: &[PreloadIssue]| {
            issues
                .iter()
                .map(|issue| issue.summary.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        if !self.errors.is_empty() {
            Verdict::critical(summaries(&self.errors))
        } else if !self.warnings.is_empty() {
            Verdict::warning(summaries(&self.warnings))
        } else {
            Verdict::ok(format!("{} is preloadable", domain))
        }
    }
}

/// Client for the status and preloadable endpoints
pub struct HstsClient<'a> {
    http: &'a dyn HttpFetch,
}

impl<'a> HstsClient<'a> {
    pub fn new(http: &'a dyn HttpFetch) -> Self {
        Self { http }
    }

    /// Raw status string for `domain`
    pub async fn status(&self, api_url: &str, domain: &str) -> Result<String, CheckError> {
        let url = domain_url(api_url, domain)?;
        let response = self.http.get(&url).await?;
        let body: StatusResponse = response.json(&url)?;
        debug!(domain, status = %body.status, "HSTS preload status");
        Ok(body.status)
    }

    pub async fn preloadable(
        &self,
        api_url: &str,
        domain: &str,
    ) -> Result<PreloadableReport, CheckError> {
        let url = domain_url(api_url, domain)?;
        let response = self.http.get(&url).await?;
        let report: PreloadableReport = response.json(&url)?;
        debug!(
            domain,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "HSTS preloadable report"
        );
        Ok(report)
    }
}

fn domain_url(api_url: &str, domain: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(api_url).map_err(|e| ConfigError::InvalidUrl {
        url: api_url.to_string(),
        message: e.to_string(),
    })?;
    url.query_pairs_mut().append_pair("domain", domain);
    Ok(url)
}
