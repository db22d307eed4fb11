//! Host check: identity, chain signatures and expiry of a live endpoint

use super::{load_identity, parse_starttls};
use crate::checks::{ChainRequest, ChainTrustValidator, ConnectionAcquirer, Thresholds};
use crate::config::ConnectionSettings;
use crate::models::{CertificateChain, Verdict};
use crate::utils::{ChainError, CheckError, Clock, ConfigError, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub const CHECK_NAME: &str = "CheckSSLHost";

/// Options as given on the command line
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub host: String,
    pub port: u16,
    pub address: Option<String>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub starttls: Option<String>,
    pub skip_hostname_verification: bool,
    pub skip_chain_verification: bool,
    pub warning: i64,
    pub critical: i64,
}

impl HostOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 443,
            address: None,
            client_cert: None,
            client_key: None,
            starttls: None,
            skip_hostname_verification: false,
            skip_chain_verification: false,
            warning: 14,
            critical: 7,
        }
    }
}

/// A validated host check
pub struct HostCheck {
    host: String,
    request: ChainRequest,
    validator: ChainTrustValidator,
    thresholds: Thresholds,
    acquirer: ConnectionAcquirer,
    clock: Arc<dyn Clock>,
}

impl HostCheck {
    pub fn new(options: HostOptions, settings: &ConnectionSettings) -> Result<Self, ConfigError> {
        let thresholds = Thresholds::new(options.warning, options.critical)?;
        let starttls = parse_starttls(options.starttls.as_deref())?;
        let identity = load_identity(options.client_cert.as_deref(), options.client_key.as_deref())?;

        let mut validator = ChainTrustValidator::new().signatures(!options.skip_chain_verification);
        if !options.skip_hostname_verification {
            validator = validator.hostname(options.host.clone());
        }

        let request = ChainRequest::new(options.host.clone(), options.port)
            .address(options.address)
            .identity(identity)
            .starttls(starttls);

        Ok(Self {
            host: options.host,
            request,
            validator,
            thresholds,
            acquirer: ConnectionAcquirer::new(settings),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self) -> Verdict {
        match self.acquirer.acquire_chain(&self.request).await {
            Ok(chain) => self.evaluate(&chain),
            Err(CheckError::Connection(e)) => Verdict::critical(format!("{} - {}", self.host, e)),
            Err(e) => Verdict::from(e),
        }
    }

    /// Identity, then signatures, then expiry of the leaf
    pub fn evaluate(&self, chain: &CertificateChain) -> Verdict {
        match self.validator.validate(chain) {
            Ok(()) => {}
            Err(ChainError::ChainInvalid { broken_links }) => {
                debug!(?broken_links, "chain has broken links");
                return Verdict::critical(format!("{} - Invalid certificate chain", self.host));
            }
            Err(e) => return Verdict::from(CheckError::from(e)),
        }

        let Some(leaf) = chain.leaf() else {
            return Verdict::from(CheckError::from(ChainError::EmptyChain));
        };
        let days = leaf.days_until_expiry(self.clock.utc_now());
        self.thresholds.classify(days).verdict(
            |elapsed| format!("{} - Expired {} days ago", self.host, elapsed),
            |left| format!("{} - {} days until expiry", self.host, left),
        )
    }
}

pub async fn run(options: HostOptions, settings: &ConnectionSettings) -> Verdict {
    match HostCheck::new(options, settings) {
        Ok(check) => check.run().await,
        Err(e) => Verdict::from(CheckError::from(e)),
    }
}
