//! CRL freshness check: minutes until the list's next update

use super::read_file;
use crate::checks::{HttpFetch, Thresholds};
use crate::models::{RevocationList, Verdict};
use crate::utils::{CheckError, Clock, ConfigError, HttpError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const CHECK_NAME: &str = "CheckSSLCRL";

#[derive(Debug, Clone)]
pub struct CrlOptions {
    /// `http(s)` URL or local path
    pub url: String,
    pub warning: i64,
    pub critical: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CrlSource {
    Remote(Url),
    Local(PathBuf),
}

impl CrlSource {
    fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => CrlSource::Remote(url),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(CrlSource::Local)
                .unwrap_or_else(|_| CrlSource::Local(PathBuf::from(raw))),
            _ => CrlSource::Local(PathBuf::from(raw)),
        }
    }
}

pub struct CrlCheck {
    label: String,
    source: CrlSource,
    thresholds: Thresholds,
    http: Arc<dyn HttpFetch>,
    clock: Arc<dyn Clock>,
}

impl CrlCheck {
    pub fn new(
        options: CrlOptions,
        http: Arc<dyn HttpFetch>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            thresholds: Thresholds::new(options.warning, options.critical)?,
            source: CrlSource::parse(&options.url),
            label: options.url,
            http,
            clock,
        })
    }

    pub async fn run(&self) -> Verdict {
        match self.evaluate().await {
            Ok(verdict) => verdict,
            Err(e) => Verdict::from(e),
        }
    }

    async fn evaluate(&self) -> Result<Verdict, CheckError> {
        let data = self.fetch().await?;
        let crl = RevocationList::parse(&data)?;
        let minutes = crl.minutes_until_next_update(self.clock.utc_now())?;
        let next_update = crl
            .next_update()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();
        debug!(source = %self.label, minutes, %next_update, revoked = crl.revoked_count(), "parsed CRL");

        Ok(self.thresholds.classify(minutes).verdict(
            |elapsed| format!("{} - Expired {} minutes ago", self.label, elapsed),
            |left| {
                format!(
                    "{} - {} minutes left, next update at {}",
                    self.label, left, next_update
                )
            },
        ))
    }

    async fn fetch(&self) -> Result<Vec<u8>, CheckError> {
        match &self.source {
            CrlSource::Remote(url) => {
                let response = self.http.get(url).await?;
                if !response.is_success() {
                    return Err(HttpError::Status {
                        url: url.to_string(),
                        status: response.status,
                    }
                    .into());
                }
                Ok(response.body)
            }
            CrlSource::Local(path) => Ok(read_file(path)?),
        }
    }
}

pub async fn run(options: CrlOptions, http: Arc<dyn HttpFetch>, clock: Arc<dyn Clock>) -> Verdict {
    match CrlCheck::new(options, http, clock) {
        Ok(check) => check.run().await,
        Err(e) => Verdict::from(CheckError::from(e)),
    }
}
