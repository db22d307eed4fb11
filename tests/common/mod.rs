//! Shared fixtures: a throwaway PKI and a one-shot local TLS server

#![allow(dead_code)]

use chrono::{DateTime, Datelike, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

/// A certificate together with its key
pub struct Issued {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn key_pem(&self) -> String {
        self.key.serialize_pem()
    }

    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivatePkcs8KeyDer::from(self.key.serialize_der()).into()
    }

    pub fn parsed(&self) -> ssl_checks::models::Certificate {
        ssl_checks::models::Certificate::from_der(self.cert.der()).unwrap()
    }
}

fn named(params: &mut CertificateParams, organization: &str, common_name: &str) {
    let mut name = DistinguishedName::new();
    name.push(DnType::OrganizationName, organization);
    name.push(DnType::CommonName, common_name);
    params.distinguished_name = name;
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    named(&mut params, "Example", common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params
}

/// Self-signed root CA named `O=Example, CN=<common_name>`
pub fn root_ca(common_name: &str) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = ca_params(common_name).self_signed(&key).unwrap();
    Issued { cert, key }
}

/// Intermediate CA signed by `issuer`
pub fn intermediate_ca(common_name: &str, issuer: &Issued) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = ca_params(common_name)
        .signed_by(&key, &issuer.cert, &issuer.key)
        .unwrap();
    Issued { cert, key }
}

/// End-entity certificate for `names`, optionally expiring at `not_after`
pub fn leaf(names: &[&str], issuer: &Issued, not_after: Option<DateTime<Utc>>) -> Issued {
    let key = KeyPair::generate().unwrap();
    let mut params =
        CertificateParams::new(names.iter().map(|n| n.to_string()).collect::<Vec<_>>()).unwrap();
    named(&mut params, "Example", names.first().copied().unwrap_or("leaf"));
    if let Some(day) = not_after {
        params.not_after = rcgen::date_time_ymd(day.year(), day.month() as u8, day.day() as u8);
    }
    let cert = params.signed_by(&key, &issuer.cert, &issuer.key).unwrap();
    Issued { cert, key }
}

/// Root, intermediate and a `localhost` leaf, ready to serve
pub struct Pki {
    pub root: Issued,
    pub intermediate: Issued,
    pub leaf: Issued,
}

impl Pki {
    pub fn new(leaf_not_after: Option<DateTime<Utc>>) -> Self {
        let root = root_ca("Test Root CA");
        let intermediate = intermediate_ca("Test Intermediate CA", &root);
        let leaf = leaf(&["localhost", "127.0.0.1"], &intermediate, leaf_not_after);
        Self {
            root,
            intermediate,
            leaf,
        }
    }

    /// Leaf then intermediate, as a server would present them
    pub fn served_chain(&self) -> Vec<CertificateDer<'static>> {
        vec![self.leaf.der(), self.intermediate.der()]
    }

    pub fn server_config(&self) -> Arc<ServerConfig> {
        server_config(self.served_chain(), self.leaf.private_key(), None)
    }
}

pub fn provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Server config presenting `chain`; with `client_ca`, client certificates
/// issued by it are required
pub fn server_config(
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    client_ca: Option<&Issued>,
) -> Arc<ServerConfig> {
    let builder = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .unwrap();

    let config = match client_ca {
        Some(ca) => {
            let mut roots = RootCertStore::empty();
            roots.add(ca.der()).unwrap();
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider())
                .build()
                .unwrap();
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(chain, key)
                .unwrap()
        }
        None => builder
            .with_no_client_auth()
            .with_single_cert(chain, key)
            .unwrap(),
    };
    Arc::new(config)
}

/// What the server saw of the client
#[derive(Debug, Default)]
pub struct ServerObservation {
    pub handshake_completed: bool,
    pub client_certificates: usize,
    /// SNI name from the ClientHello
    pub server_name: Option<String>,
}

/// Accept one connection, optionally run the SMTP STARTTLS dialogue, then
/// complete a TLS handshake
pub async fn spawn_tls_server(
    config: Arc<ServerConfig>,
    smtp_starttls: bool,
) -> (SocketAddr, JoinHandle<ServerObservation>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let acceptor = TlsAcceptor::from(config);

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        if smtp_starttls {
            stream.write_all(b"220 localhost ESMTP test\r\n").await.unwrap();
            {
                let mut reader = BufReader::new(&mut stream);
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                assert_eq!(line, "STARTTLS\r\n");
            }
            stream.write_all(b"220 2.0.0 Ready to start TLS\r\n").await.unwrap();
        }

        let mut observation = ServerObservation::default();
        if let Ok(mut tls) = acceptor.accept(stream).await {
            observation.handshake_completed = true;
            observation.client_certificates = tls
                .get_ref()
                .1
                .peer_certificates()
                .map(|certs| certs.len())
                .unwrap_or(0);
            observation.server_name = tls.get_ref().1.server_name().map(str::to_string);
            let mut buf = [0u8; 1];
            let _ = tls.read(&mut buf).await;
        }
        observation
    });

    (addr, handle)
}

/// Accept one connection, greet with `greeting` and report every byte the
/// client sent afterwards
pub async fn spawn_greeting_server(greeting: &'static [u8]) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(greeting).await.unwrap();
        let mut received = Vec::new();
        let _ = stream.read_to_end(&mut received).await;
        received
    });

    (addr, handle)
}
