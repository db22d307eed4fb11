//! Anchor check: the presented chain must end at an expected root

use crate::checks::chain::verify_anchor;
use crate::checks::{ChainRequest, ConnectionAcquirer};
use crate::config::ConnectionSettings;
use crate::models::{AnchorSpec, CertificateChain, MatchMode, NameFormat, Verdict};
use crate::utils::{ChainError, CheckError, ConfigError};
use tracing::warn;

pub const CHECK_NAME: &str = "CheckSSLAnchor";

const RETRIEVAL_FAILED: &str =
    "An error was encountered while trying to retrieve the certificate chain.";

#[derive(Debug, Clone)]
pub struct AnchorOptions {
    pub host: String,
    pub port: u16,
    pub servername: Option<String>,
    /// Expected chain line, e.g. `i:O = Digital Signature Trust Co., CN = DST Root CA X3`
    pub anchor: String,
    pub regexp: bool,
    pub format: String,
}

impl AnchorOptions {
    pub fn new(host: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 443,
            servername: None,
            anchor: anchor.into(),
            regexp: false,
            format: NameFormat::Oneline.as_str().to_string(),
        }
    }
}

pub struct AnchorCheck {
    request: ChainRequest,
    anchor: AnchorSpec,
    acquirer: ConnectionAcquirer,
}

impl AnchorCheck {
    pub fn new(options: AnchorOptions, settings: &ConnectionSettings) -> Result<Self, ConfigError> {
        let format: NameFormat = options.format.parse()?;
        let mode = if options.regexp {
            MatchMode::Pattern
        } else {
            MatchMode::Literal
        };

        Ok(Self {
            request: ChainRequest::new(options.host, options.port).sni(options.servername),
            anchor: AnchorSpec::new(options.anchor, mode, format)?,
            acquirer: ConnectionAcquirer::new(settings),
        })
    }

    pub async fn run(&self) -> Verdict {
        match self.acquirer.acquire_chain(&self.request).await {
            Ok(chain) => self.evaluate(&chain),
            Err(e) => {
                warn!(error = %e, "could not retrieve certificate chain");
                Verdict::critical(RETRIEVAL_FAILED)
            }
        }
    }

    pub fn evaluate(&self, chain: &CertificateChain) -> Verdict {
        match verify_anchor(chain, &self.anchor) {
            Ok(()) => Verdict::ok("Root anchor has been found."),
            Err(ChainError::AnchorMismatch { found, .. }) => {
                Verdict::critical(format!("Root anchor did not match. Found \"{}\" instead.", found))
            }
            Err(ChainError::EmptyChain) => Verdict::critical(RETRIEVAL_FAILED),
            Err(e) => Verdict::from(CheckError::from(e)),
        }
    }
}

pub async fn run(options: AnchorOptions, settings: &ConnectionSettings) -> Verdict {
    match AnchorCheck::new(options, settings) {
        Ok(check) => check.run().await,
        Err(e) => Verdict::from(CheckError::from(e)),
    }
}
