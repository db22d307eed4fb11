//! Root issuer check: the trust-store anchor of a URL's chain must carry an
//! expected issuer name

use super::read_file;
use crate::checks::chain::match_anchor;
use crate::checks::{ChainRequest, ConnectionAcquirer, TrustOutcome, TrustReport, TrustStore};
use crate::config::ConnectionSettings;
use crate::models::{AnchorSpec, MatchMode, NameFormat, Verdict};
use crate::utils::{ChainError, CheckError, ConfigError};
use std::path::PathBuf;
use url::{Host, Url};

pub const CHECK_NAME: &str = "CheckSSLRootIssuer";

#[derive(Debug, Clone)]
pub struct RootIssuerOptions {
    pub url: String,
    /// Expected issuer, e.g. `CN=DST Root CA X3,O=Digital Signature Trust Co.`
    pub issuer: String,
    pub regexp: bool,
    pub format: String,
    /// PEM bundle used instead of the system trust store
    pub ca_file: Option<PathBuf>,
}

impl RootIssuerOptions {
    pub fn new(url: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            issuer: issuer.into(),
            regexp: false,
            format: NameFormat::Rfc2253.as_str().to_string(),
            ca_file: None,
        }
    }
}

pub struct RootIssuerCheck {
    url: Url,
    issuer: AnchorSpec,
    store: TrustStore,
    acquirer: ConnectionAcquirer,
}

impl RootIssuerCheck {
    pub fn new(options: RootIssuerOptions, settings: &ConnectionSettings) -> Result<Self, ConfigError> {
        let url = Url::parse(&options.url).map_err(|e| ConfigError::InvalidUrl {
            url: options.url.clone(),
            message: e.to_string(),
        })?;
        let format: NameFormat = options.format.parse()?;
        let mode = if options.regexp {
            MatchMode::Pattern
        } else {
            MatchMode::Literal
        };
        let store = match &options.ca_file {
            Some(path) => TrustStore::from_pem(&read_file(path)?)?,
            None => TrustStore::system(),
        };

        Ok(Self {
            url,
            issuer: AnchorSpec::new(options.issuer, mode, format)?,
            store,
            acquirer: ConnectionAcquirer::new(settings),
        })
    }

    pub async fn run(&self) -> Verdict {
        if self.url.scheme() != "https" {
            return Verdict::critical(format!(
                "url protocol must be https, you specified {}",
                self.url
            ));
        }
        let request = match request_for(&self.url) {
            Ok(request) => request,
            Err(e) => return Verdict::from(CheckError::from(e)),
        };

        match self.store.verify(&self.acquirer, &request).await {
            Ok(report) => self.evaluate(&report),
            Err(e) => Verdict::from(e),
        }
    }

    /// Surface a verification failure, else compare the anchor's issuer
    pub fn evaluate(&self, report: &TrustReport) -> Verdict {
        if let TrustOutcome::Failed { code, description } = &report.outcome {
            return Verdict::from(CheckError::from(ChainError::VerificationFailed {
                code: code.clone(),
                description: description.clone(),
            }));
        }

        let found = report.anchor.issuer().format(self.issuer.format());
        match match_anchor(&found, &self.issuer) {
            Ok(()) => Verdict::ok("Root certificate in chain has expected issuer name"),
            Err(_) => Verdict::critical(format!(
                "Root certificate issuer did not match expected name. Found: \"{}\"",
                found
            )),
        }
    }
}

fn request_for(url: &Url) -> Result<ChainRequest, ConfigError> {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => {
            return Err(ConfigError::InvalidUrl {
                url: url.to_string(),
                message: "missing host".to_string(),
            })
        }
    };
    Ok(ChainRequest::new(host, url.port_or_known_default().unwrap_or(443)))
}

pub async fn run(options: RootIssuerOptions, settings: &ConnectionSettings) -> Verdict {
    match RootIssuerCheck::new(options, settings) {
        Ok(check) => check.run().await,
        Err(e) => Verdict::from(CheckError::from(e)),
    }
}
