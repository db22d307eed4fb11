//! Certificate expiry check for a remote endpoint or a local certificate file

use super::{parse_starttls, read_file};
use crate::checks::{evaluate, ChainRequest, ConnectionAcquirer, Thresholds, TimeUnit};
use crate::config::ConnectionSettings;
use crate::models::{Certificate, Verdict};
use crate::utils::{CertificateError, ChainError, CheckError, Clock, ConfigError, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const CHECK_NAME: &str = "CheckSSLCert";

#[derive(Debug, Clone, Default)]
pub struct CertOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// SNI name, defaults to `host`
    pub servername: Option<String>,
    /// PEM or DER certificate file
    pub pem: Option<PathBuf>,
    pub pkcs12: Option<PathBuf>,
    /// PKCS#12 pass phrase
    pub pass: Option<String>,
    pub starttls: Option<String>,
    pub warning: i64,
    pub critical: i64,
}

/// Where the certificate comes from
#[derive(Debug, Clone)]
pub enum CertSource {
    Pem(PathBuf),
    Pkcs12 { path: PathBuf, pass: String },
    Remote(ChainRequest),
}

pub struct CertCheck {
    source: CertSource,
    warning: i64,
    critical: i64,
    acquirer: ConnectionAcquirer,
    clock: Arc<dyn Clock>,
}

impl CertCheck {
    pub fn new(options: CertOptions, settings: &ConnectionSettings) -> Result<Self, ConfigError> {
        Thresholds::new(options.warning, options.critical)?;

        let source = match (options.pem, options.pkcs12) {
            (Some(path), _) => {
                require_file(&path)?;
                CertSource::Pem(path)
            }
            (None, Some(path)) => {
                let Some(pass) = options.pass else {
                    return Err(ConfigError::MissingRequired {
                        message: "No pass phrase specified for PKCS#12 certificate".to_string(),
                    });
                };
                require_file(&path)?;
                CertSource::Pkcs12 { path, pass }
            }
            (None, None) => {
                let (Some(host), Some(port)) = (options.host, options.port) else {
                    return Err(ConfigError::MissingRequired {
                        message: "Host and port required".to_string(),
                    });
                };
                let starttls = parse_starttls(options.starttls.as_deref())?;
                CertSource::Remote(
                    ChainRequest::new(host, port)
                        .sni(options.servername)
                        .starttls(starttls),
                )
            }
        };

        Ok(Self {
            source,
            warning: options.warning,
            critical: options.critical,
            acquirer: ConnectionAcquirer::new(settings),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self) -> Verdict {
        match self.certificate().await {
            Ok(cert) => evaluate(
                cert.days_until_expiry(self.clock.utc_now()),
                self.warning,
                self.critical,
                TimeUnit::Days,
            ),
            Err(e) => Verdict::from(e),
        }
    }

    /// The first certificate of the file, or the endpoint's leaf
    async fn certificate(&self) -> Result<Certificate, CheckError> {
        match &self.source {
            CertSource::Pem(path) => {
                let data = read_file(path)?;
                Certificate::from_pem_or_der(&data)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| ChainError::EmptyChain.into())
            }
            CertSource::Pkcs12 { path, pass } => {
                let data = read_file(path)?;
                Ok(pkcs12_certificate(&data, pass)?)
            }
            CertSource::Remote(request) => {
                let chain = self.acquirer.acquire_chain(request).await?;
                chain.leaf().cloned().ok_or_else(|| ChainError::EmptyChain.into())
            }
        }
    }
}

fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::MissingRequired {
            message: "No such cert".to_string(),
        })
    }
}

/// The certificate of a PKCS#12 archive: the leaf of the first private key
/// chain, else the first standalone certificate
fn pkcs12_certificate(data: &[u8], pass: &str) -> Result<Certificate, CertificateError> {
    let keystore = p12_keystore::KeyStore::from_pkcs12(data, pass).map_err(|e| {
        CertificateError::ParseError {
            message: format!("PKCS#12: {}", e),
        }
    })?;

    let mut leaf = None;
    let mut standalone = None;
    for (alias, entry) in keystore.entries() {
        debug!(%alias, "PKCS#12 entry");
        match entry {
            p12_keystore::KeyStoreEntry::PrivateKeyChain(chain) => {
                if leaf.is_none() {
                    leaf = chain.chain().first().map(|cert| cert.as_der().to_vec());
                }
            }
            p12_keystore::KeyStoreEntry::Certificate(cert) => {
                if standalone.is_none() {
                    standalone = Some(cert.as_der().to_vec());
                }
            }
        }
    }

    let der = leaf.or(standalone).ok_or_else(|| CertificateError::ParseError {
        message: "PKCS#12: no certificate found".to_string(),
    })?;
    Certificate::from_der(&der)
}

pub async fn run(options: CertOptions, settings: &ConnectionSettings) -> Verdict {
    match CertCheck::new(options, settings) {
        Ok(check) => check.run().await,
        Err(e) => Verdict::from(CheckError::from(e)),
    }
}
