//! Certificate chain acquisition
//!
//! Opens a TCP connection, optionally upgrades it with STARTTLS, performs the
//! TLS handshake and returns the peer's certificate chain exactly as it was
//! presented. Certificates are accepted unconditionally here so that broken
//! or untrusted chains can still be inspected; trust decisions belong to
//! [`super::chain`] and [`super::trust_store`].

use super::starttls::StarttlsProtocol;
use crate::config::settings::ConnectionSettings;
use crate::models::certificate::is_pem;
use crate::models::{Certificate, CertificateChain};
use crate::utils::{CheckError, ConfigError, ConnectionError};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as RustlsError, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// The ring provider, used for every TLS configuration in this crate
pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// A verifier that accepts any server certificate.
/// Handshake signatures are still checked against the presented key.
#[derive(Debug)]
pub(crate) struct AcceptAnyCertVerifier {
    provider: Arc<CryptoProvider>,
}

impl AcceptAnyCertVerifier {
    pub(crate) fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for AcceptAnyCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Client certificate chain and private key presented during the handshake
#[derive(Debug)]
pub struct ClientIdentity {
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    /// Decode a certificate (chain) and its private key, each given as PEM
    /// or as raw DER
    pub fn from_pem_or_der(cert: &[u8], key: &[u8]) -> Result<Self, ConfigError> {
        let certs = if is_pem(cert) {
            rustls_pemfile::certs(&mut &cert[..])
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::InvalidIdentity {
                    message: format!("client certificate: {}", e),
                })?
        } else {
            Certificate::from_der(cert).map_err(|e| ConfigError::InvalidIdentity {
                message: format!("client certificate: {}", e),
            })?;
            vec![CertificateDer::from(cert.to_vec())]
        };
        if certs.is_empty() {
            return Err(ConfigError::InvalidIdentity {
                message: "no certificate found in client certificate".to_string(),
            });
        }

        let key = if is_pem(key) {
            rustls_pemfile::private_key(&mut &key[..])
                .map_err(|e| ConfigError::InvalidIdentity {
                    message: format!("client key: {}", e),
                })?
                .ok_or_else(|| ConfigError::InvalidIdentity {
                    message: "no private key found in client key".to_string(),
                })?
        } else {
            PrivateKeyDer::try_from(key.to_vec()).map_err(|e| ConfigError::InvalidIdentity {
                message: format!("client key: {}", e),
            })?
        };

        Ok(Self { certs, key })
    }
}

impl Clone for ClientIdentity {
    fn clone(&self) -> Self {
        Self {
            certs: self.certs.clone(),
            key: self.key.clone_key(),
        }
    }
}

/// Where to connect and how to present ourselves
#[derive(Debug, Clone)]
pub struct ChainRequest {
    pub host: String,
    pub port: u16,
    /// Transport target used instead of `host`
    pub address: Option<String>,
    /// TLS identity used instead of `host`
    pub sni: Option<String>,
    pub identity: Option<ClientIdentity>,
    pub starttls: Option<StarttlsProtocol>,
}

impl ChainRequest {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            address: None,
            sni: None,
            identity: None,
            starttls: None,
        }
    }

    pub fn address(mut self, address: Option<String>) -> Self {
        self.address = address;
        self
    }

    pub fn sni(mut self, sni: Option<String>) -> Self {
        self.sni = sni;
        self
    }

    pub fn identity(mut self, identity: Option<ClientIdentity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn starttls(mut self, starttls: Option<StarttlsProtocol>) -> Self {
        self.starttls = starttls;
        self
    }

    /// Host used for the transport connection
    pub fn connect_host(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.host)
    }

    /// Name sent in the SNI extension
    pub fn server_name(&self) -> &str {
        self.sni.as_deref().unwrap_or(&self.host)
    }

    /// `host:port` label used in messages
    pub fn target(&self) -> String {
        format!("{}:{}", self.connect_host(), self.port)
    }
}

/// Acquires peer certificate chains. Never retries.
#[derive(Debug, Clone)]
pub struct ConnectionAcquirer {
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl ConnectionAcquirer {
    pub fn new(settings: &ConnectionSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout(),
            handshake_timeout: settings.handshake_timeout(),
        }
    }

    /// Connect, negotiate and return the chain leaf-first, untouched
    pub async fn acquire_chain(&self, request: &ChainRequest) -> Result<CertificateChain, CheckError> {
        let provider = crypto_provider();
        let verifier = Arc::new(AcceptAnyCertVerifier::new(Arc::clone(&provider)));
        let ders = self.handshake(request, provider, verifier).await?;
        info!(
            target = %request.target(),
            certificates = ders.len(),
            "received certificate chain"
        );
        Ok(CertificateChain::from_der_list(&ders)?)
    }

    /// Perform the full connection sequence with the given verifier and
    /// return the DER certificates the peer presented
    pub(crate) async fn handshake(
        &self,
        request: &ChainRequest,
        provider: Arc<CryptoProvider>,
        verifier: Arc<dyn ServerCertVerifier>,
    ) -> Result<Vec<CertificateDer<'static>>, ConnectionError> {
        let target = request.target();
        let config = build_client_config(provider, verifier, request.identity.as_ref())?;

        let server_name = ServerName::try_from(request.server_name().to_string()).map_err(|_| {
            ConnectionError::InvalidServerName {
                name: request.server_name().to_string(),
            }
        })?;

        debug!(%target, "opening connection");
        let mut stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((request.connect_host(), request.port)),
        )
        .await
        .map_err(|_| ConnectionError::Timeout {
            target: target.clone(),
            stage: "TCP connection".to_string(),
        })?
        .map_err(|e| ConnectionError::from_io(&target, e))?;

        if let Some(protocol) = request.starttls {
            debug!(%target, %protocol, "negotiating STARTTLS");
            tokio::time::timeout(
                self.handshake_timeout,
                protocol.negotiate(&mut stream, &target),
            )
            .await
            .map_err(|_| ConnectionError::Timeout {
                target: target.clone(),
                stage: "STARTTLS negotiation".to_string(),
            })??;
        }

        let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
        let mut tls_stream = tokio::time::timeout(
            self.handshake_timeout,
            connector.connect(server_name, stream),
        )
        .await
        .map_err(|_| ConnectionError::Timeout {
            target: target.clone(),
            stage: "TLS handshake".to_string(),
        })?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::ConnectionReset => ConnectionError::from_io(&target, e),
            _ => ConnectionError::Handshake {
                target: target.clone(),
                message: e.to_string(),
            },
        })?;

        let (_, connection) = tls_stream.get_ref();
        let certificates: Vec<CertificateDer<'static>> = connection
            .peer_certificates()
            .map(|certs| certs.iter().map(|c| c.clone().into_owned()).collect())
            .unwrap_or_default();
        debug!(
            %target,
            protocol = ?connection.protocol_version(),
            "TLS handshake complete"
        );

        // Best effort close_notify; the socket is closed on drop regardless
        let _ = tls_stream.shutdown().await;

        if certificates.is_empty() {
            return Err(ConnectionError::NoCertificates { target });
        }
        Ok(certificates)
    }
}

fn build_client_config(
    provider: Arc<CryptoProvider>,
    verifier: Arc<dyn ServerCertVerifier>,
    identity: Option<&ClientIdentity>,
) -> Result<ClientConfig, ConnectionError> {
    let builder = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ConnectionError::Tls {
            message: e.to_string(),
        })?
        .dangerous()
        .with_custom_certificate_verifier(verifier);

    match identity {
        Some(identity) => builder
            .with_client_auth_cert(identity.certs.clone(), identity.key.clone_key())
            .map_err(|e| ConnectionError::Tls {
                message: format!("Failed to use client certificate: {}", e),
            }),
        None => Ok(builder.with_no_client_auth()),
    }
}
