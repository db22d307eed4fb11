//! Trust-store validated handshakes
//!
//! Unlike [`super::connection::ConnectionAcquirer::acquire_chain`], the
//! handshake here is verified against a root store. The presented chain is
//! captured before verification runs, so a failed verification still reports
//! what the server sent and which store certificate anchors it.

use super::connection::{crypto_provider, ChainRequest, ConnectionAcquirer};
use crate::models::{Certificate, CertificateChain};
use crate::utils::{CheckError, ConfigError, ConnectionError};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, Error as RustlsError, RootCertStore, SignatureScheme};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// What the verifier saw during one handshake
#[derive(Debug, Default)]
struct Capture {
    presented: Vec<CertificateDer<'static>>,
    error: Option<RustlsError>,
}

/// A verifier wrapper that records the presented chain and the verdict of
/// the inner verifier before passing it on
#[derive(Debug)]
struct CapturingVerifier {
    inner: Arc<dyn ServerCertVerifier>,
    capture: Arc<Mutex<Capture>>,
}

impl CapturingVerifier {
    fn new(inner: Arc<dyn ServerCertVerifier>, capture: Arc<Mutex<Capture>>) -> Self {
        Self { inner, capture }
    }
}

impl ServerCertVerifier for CapturingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        let result =
            self.inner
                .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now);

        if let Ok(mut capture) = self.capture.lock() {
            capture.presented = Vec::with_capacity(intermediates.len() + 1);
            capture.presented.push(end_entity.clone().into_owned());
            capture
                .presented
                .extend(intermediates.iter().map(|c| c.clone().into_owned()));
            capture.error = result.as_ref().err().cloned();
        }
        result
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Result of chain-of-trust verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustOutcome {
    Verified,
    /// `code` is the verifier's error identifier, `description` its message
    Failed { code: String, description: String },
}

/// The presented chain, the certificate anchoring it and the store's verdict
#[derive(Debug, Clone)]
pub struct TrustReport {
    pub observed: CertificateChain,
    pub anchor: Certificate,
    pub outcome: TrustOutcome,
}

impl TrustReport {
    pub fn is_verified(&self) -> bool {
        self.outcome == TrustOutcome::Verified
    }
}

/// Root certificates used for validated handshakes
#[derive(Debug, Clone)]
pub struct TrustStore {
    roots: Arc<RootCertStore>,
    /// Parsed store certificates, used to locate the anchor of a chain
    certificates: Vec<Certificate>,
}

impl TrustStore {
    /// The operating system store, or the bundled Mozilla roots when the
    /// system store yields nothing
    pub fn system() -> Self {
        let result = rustls_native_certs::load_native_certs();
        for error in &result.errors {
            warn!(%error, "failed to load some system certificates");
        }

        if result.certs.is_empty() {
            warn!("system trust store is empty, using bundled webpki roots");
            let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            return Self {
                roots: Arc::new(roots),
                certificates: Vec::new(),
            };
        }

        Self::from_ders(result.certs)
    }

    /// A store holding exactly the certificates of a PEM document
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, ConfigError> {
        let ders = rustls_pemfile::certs(&mut &pem_data[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "trust store".to_string(),
                message: e.to_string(),
            })?;
        if ders.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "trust store".to_string(),
                message: "no certificates found".to_string(),
            });
        }
        Ok(Self::from_ders(ders))
    }

    fn from_ders(ders: Vec<CertificateDer<'static>>) -> Self {
        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(ders.iter().cloned());
        debug!(added, ignored, "loaded trust store");

        let certificates = ders
            .iter()
            .filter_map(|der| Certificate::from_der(der).ok())
            .collect();

        Self {
            roots: Arc::new(roots),
            certificates,
        }
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Handshake with chain-of-trust verification against this store.
    ///
    /// A verification failure is reported in the outcome, not as an error;
    /// errors are reserved for failures before a chain was seen.
    pub async fn verify(
        &self,
        acquirer: &ConnectionAcquirer,
        request: &ChainRequest,
    ) -> Result<TrustReport, CheckError> {
        let provider = crypto_provider();
        let inner = WebPkiServerVerifier::builder_with_provider(
            Arc::clone(&self.roots),
            Arc::clone(&provider),
        )
        .build()
        .map_err(|e| ConnectionError::Tls {
            message: format!("Failed to build verifier: {}", e),
        })?;

        let capture = Arc::new(Mutex::new(Capture::default()));
        let verifier = Arc::new(CapturingVerifier::new(inner, Arc::clone(&capture)));
        let handshake = acquirer.handshake(request, provider, verifier).await;

        let Capture { presented, error } = match capture.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let outcome = match (error, handshake) {
            (Some(error), _) => TrustOutcome::Failed {
                code: format!("{:?}", error),
                description: error.to_string(),
            },
            (None, Ok(_)) => TrustOutcome::Verified,
            (None, Err(e)) => return Err(e.into()),
        };
        if presented.is_empty() {
            return Err(ConnectionError::NoCertificates {
                target: request.target(),
            }
            .into());
        }

        let observed = CertificateChain::from_der_list(&presented)?;
        let anchor = self.anchor_for(&observed)?;
        info!(
            target = %request.target(),
            verified = matches!(outcome, TrustOutcome::Verified),
            anchor = %anchor.subject(),
            "trust store verification finished"
        );

        Ok(TrustReport {
            observed,
            anchor,
            outcome,
        })
    }

    /// The store certificate that is, or issued, the outermost presented
    /// certificate; the outermost certificate itself when none matches
    pub fn anchor_for(&self, chain: &CertificateChain) -> Result<Certificate, CheckError> {
        let outermost = chain
            .outermost()
            .ok_or(crate::utils::ChainError::EmptyChain)?;

        let anchor = self
            .certificates
            .iter()
            .find(|root| root.der() == outermost.der())
            .or_else(|| {
                self.certificates.iter().find(|root| {
                    root.subject().raw() == outermost.issuer().raw()
                        && outermost.verify_signed_by(root)
                })
            })
            .unwrap_or(outermost);
        Ok(anchor.clone())
    }
}
