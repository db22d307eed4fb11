//! SSL Labs rating poller
//!
//! Submits an analysis job for a domain and polls it until the service
//! reports it ready, bounded both by an attempt count and by a wall-clock
//! deadline. Between polls the service's own ETA is honoured when it exceeds
//! the configured floor.

use super::http::HttpFetch;
use crate::config::RatingSettings;
use crate::models::{Grade, JobStatus, RatingJob, Status, Verdict};
use crate::utils::{CheckError, Clock, ConfigError, RatingError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Poller bounds and API location
#[derive(Debug, Clone)]
pub struct RatingConfig {
    pub api_url: Url,
    pub max_attempts: u32,
    pub between_checks: Duration,
    pub timeout: Duration,
}

impl RatingConfig {
    pub fn from_settings(settings: &RatingSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(&settings.api_url)?,
            max_attempts: settings.max_attempts,
            between_checks: settings.between_checks(),
            timeout: settings.timeout(),
        })
    }

    fn analyze_url(&self, domain: &str, use_cache: bool) -> Result<Url, ConfigError> {
        let mut url = self
            .api_url
            .join("analyze")
            .map_err(|e| ConfigError::InvalidUrl {
                url: self.api_url.to_string(),
                message: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("host", domain)
            .append_pair("startNew", if use_cache { "off" } else { "on" });
        Ok(url)
    }
}

/// Parse the API base, making sure relative joins keep its last segment
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    status: String,
    #[serde(default)]
    endpoints: Option<Vec<EndpointResponse>>,
}

#[derive(Debug, Deserialize)]
struct EndpointResponse {
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    eta: Option<i64>,
}

impl From<AnalyzeResponse> for RatingJob {
    fn from(response: AnalyzeResponse) -> Self {
        let status = match response.status.as_str() {
            "READY" => JobStatus::Ready,
            "ERROR" => JobStatus::Error,
            _ => JobStatus::Pending,
        };
        let endpoints = response.endpoints.unwrap_or_default();

        RatingJob {
            status,
            eta_secs: endpoints.first().and_then(|e| e.eta),
            grades: endpoints.into_iter().filter_map(|e| e.grade).collect(),
        }
    }
}

/// Drives one remote analysis job to completion
pub struct RatingPoller {
    http: Arc<dyn HttpFetch>,
    clock: Arc<dyn Clock>,
    config: RatingConfig,
}

impl RatingPoller {
    pub fn new(http: Arc<dyn HttpFetch>, clock: Arc<dyn Clock>, config: RatingConfig) -> Self {
        Self {
            http,
            clock,
            config,
        }
    }

    /// Issue one analyze request. `use_cache = false` forces a fresh run.
    pub async fn submit(&self, domain: &str, use_cache: bool) -> Result<RatingJob, CheckError> {
        let url = self.config.analyze_url(domain, use_cache)?;
        let response = self.http.get(&url).await?;
        if !response.is_success() {
            return Err(RatingError::BadResponse {
                message: format!("status {}", response.status),
            }
            .into());
        }

        let analysis: AnalyzeResponse =
            serde_json::from_slice(&response.body).map_err(|e| RatingError::BadResponse {
                message: e.to_string(),
            })?;
        let job = RatingJob::from(analysis);
        if job.status == JobStatus::Error {
            return Err(RatingError::JobError {
                domain: domain.to_string(),
            }
            .into());
        }
        Ok(job)
    }

    /// Poll until the job is ready, the attempts run out or the deadline passes
    pub async fn poll(&self, domain: &str) -> Result<RatingJob, CheckError> {
        let started = self.clock.now();
        let deadline = started + self.config.timeout;
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            let remaining = deadline.saturating_duration_since(self.clock.now());
            if remaining.is_zero() {
                return Err(RatingError::PollTimeout {
                    attempts: attempt - 1,
                }
                .into());
            }

            debug!(domain, attempt, max_attempts, "polling rating API");
            let job = tokio::time::timeout(remaining, self.submit(domain, attempt > 1))
                .await
                .map_err(|_| RatingError::PollTimeout { attempts: attempt })??;

            if job.status == JobStatus::Ready {
                info!(
                    domain,
                    attempt,
                    elapsed = ?self.clock.now().saturating_duration_since(started),
                    "rating job ready"
                );
                return Ok(job);
            }
            if attempt == max_attempts {
                break;
            }

            let between = self.config.between_checks;
            let wait = match job.eta_secs {
                Some(eta) if eta > between.as_secs() as i64 => Duration::from_secs(eta as u64),
                _ => between,
            };
            let remaining = deadline.saturating_duration_since(self.clock.now());
            debug!(domain, attempt, eta = ?job.eta_secs, ?wait, ?remaining, "rating job pending");

            if wait >= remaining {
                self.clock.sleep(remaining).await;
                warn!(domain, attempt, "rating deadline reached while waiting");
                return Err(RatingError::PollTimeout { attempts: attempt }.into());
            }
            self.clock.sleep(wait).await;
        }

        warn!(domain, max_attempts, "rating job did not finish");
        Err(RatingError::PollTimeout {
            attempts: max_attempts,
        }
        .into())
    }

    /// Poll to completion and return the worst endpoint grade
    pub async fn rate(&self, domain: &str) -> Result<Grade, CheckError> {
        let job = self.poll(domain).await?;
        match job.worst_grade() {
            Ok(Some(grade)) => Ok(grade),
            Ok(None) => Err(RatingError::UnratedDomain {
                domain: domain.to_string(),
            }
            .into()),
            Err(grade) => Err(RatingError::UnknownGrade {
                domain: domain.to_string(),
                grade,
            }
            .into()),
        }
    }
}

/// Warning and critical grades; a worse grade has a higher rank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeThresholds {
    warning: Grade,
    critical: Grade,
}

impl GradeThresholds {
    /// Rejects a warning grade worse than the critical grade
    pub fn new(warning: Grade, critical: Grade) -> Result<Self, ConfigError> {
        if warning.rank() > critical.rank() {
            return Err(ConfigError::InvertedGrades {
                warning: warning.to_string(),
                critical: critical.to_string(),
            });
        }
        Ok(Self { warning, critical })
    }

    /// Grades strictly worse than a bound trigger it
    pub fn status(&self, grade: Grade) -> Status {
        if grade.rank() > self.critical.rank() {
            Status::Critical
        } else if grade.rank() > self.warning.rank() {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            warning: Grade::AMinus,
            critical: Grade::B,
        }
    }
}

/// Verdict for the worst grade of `domain`
pub fn evaluate_grade(domain: &str, worst: Grade, thresholds: &GradeThresholds) -> Verdict {
    Verdict::new(
        thresholds.status(worst),
        format!("{} rated {}", domain, worst),
    )
}
