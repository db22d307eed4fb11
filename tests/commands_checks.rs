//! Certificate commands end to end against a local TLS server

mod common;

use chrono::{TimeZone, Utc};
use common::{leaf, root_ca, server_config, spawn_tls_server, Pki};
use ssl_checks::commands::anchor::{self, AnchorOptions};
use ssl_checks::commands::cert::{CertCheck, CertOptions};
use ssl_checks::commands::host::{HostCheck, HostOptions};
use ssl_checks::commands::root_issuer::{self, RootIssuerOptions};
use ssl_checks::config::ConnectionSettings;
use ssl_checks::models::Status;
use ssl_checks::utils::ManualClock;
use std::io::Write;
use std::sync::Arc;

fn settings() -> ConnectionSettings {
    ConnectionSettings {
        connect_timeout_secs: 5,
        handshake_timeout_secs: 5,
    }
}

fn frozen_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
    ))
}

fn expiring_pki() -> Pki {
    Pki::new(Some(Utc.with_ymd_and_hms(2030, 1, 11, 0, 0, 0).unwrap()))
}

fn host_options(port: u16) -> HostOptions {
    HostOptions {
        port,
        address: Some("127.0.0.1".to_string()),
        ..HostOptions::new("localhost")
    }
}

#[tokio::test]
async fn test_host_expiring_soon_is_warning() {
    let pki = expiring_pki();
    let (addr, _server) = spawn_tls_server(pki.server_config(), false).await;

    let verdict = HostCheck::new(host_options(addr.port()), &settings())
        .unwrap()
        .with_clock(frozen_clock())
        .run()
        .await;

    assert_eq!(verdict.status, Status::Warning);
    assert_eq!(verdict.message, "localhost - 10 days until expiry");
}

#[tokio::test]
async fn test_host_expired_certificate() {
    let pki = Pki::new(Some(Utc.with_ymd_and_hms(2029, 12, 30, 0, 0, 0).unwrap()));
    let (addr, _server) = spawn_tls_server(pki.server_config(), false).await;

    let verdict = HostCheck::new(host_options(addr.port()), &settings())
        .unwrap()
        .with_clock(frozen_clock())
        .run()
        .await;

    assert_eq!(verdict.status, Status::Critical);
    assert_eq!(verdict.message, "localhost - Expired 2 days ago");
}

#[tokio::test]
async fn test_host_name_mismatch_is_critical() {
    let root = root_ca("Test Root CA");
    let other = leaf(&["other.example"], &root, None);
    let config = server_config(vec![other.der(), root.der()], other.private_key(), None);
    let (addr, _server) = spawn_tls_server(config, false).await;

    let verdict = HostCheck::new(host_options(addr.port()), &settings())
        .unwrap()
        .run()
        .await;

    assert_eq!(verdict.status, Status::Critical);
    assert!(verdict.message.starts_with("localhost hostname mismatch"));
}

#[tokio::test]
async fn test_host_mismatch_can_be_skipped() {
    let root = root_ca("Test Root CA");
    let other = leaf(&["other.example"], &root, None);
    let config = server_config(vec![other.der(), root.der()], other.private_key(), None);
    let (addr, _server) = spawn_tls_server(config, false).await;

    let options = HostOptions {
        skip_hostname_verification: true,
        ..host_options(addr.port())
    };
    let verdict = HostCheck::new(options, &settings()).unwrap().run().await;
    assert_eq!(verdict.status, Status::Ok);
}

#[tokio::test]
async fn test_host_broken_chain_is_critical() {
    let pki = Pki::new(None);
    let stranger = root_ca("Unrelated Root CA");
    let config = server_config(
        vec![pki.leaf.der(), stranger.der()],
        pki.leaf.private_key(),
        None,
    );
    let (addr, _server) = spawn_tls_server(config, false).await;

    let verdict = HostCheck::new(host_options(addr.port()), &settings())
        .unwrap()
        .run()
        .await;

    assert_eq!(verdict.status, Status::Critical);
    assert_eq!(verdict.message, "localhost - Invalid certificate chain");
}

#[tokio::test]
async fn test_host_unreachable_names_the_host() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let verdict = HostCheck::new(host_options(port), &settings())
        .unwrap()
        .run()
        .await;

    assert_eq!(verdict.status, Status::Critical);
    assert!(verdict.message.starts_with("localhost - "));
}

#[tokio::test]
async fn test_cert_from_pem_file() {
    let pki = expiring_pki();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(pki.leaf.pem().as_bytes()).unwrap();

    let options = CertOptions {
        pem: Some(file.path().to_path_buf()),
        warning: 30,
        critical: 5,
        ..CertOptions::default()
    };
    let verdict = CertCheck::new(options, &settings())
        .unwrap()
        .with_clock(frozen_clock())
        .run()
        .await;

    assert_eq!(verdict.status, Status::Warning);
    assert_eq!(verdict.message, "10 days left");
}

#[tokio::test]
async fn test_cert_from_der_file() {
    let pki = expiring_pki();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(pki.leaf.der().as_ref()).unwrap();

    let options = CertOptions {
        pem: Some(file.path().to_path_buf()),
        warning: 30,
        critical: 5,
        ..CertOptions::default()
    };
    let verdict = CertCheck::new(options, &settings())
        .unwrap()
        .with_clock(frozen_clock())
        .run()
        .await;

    assert_eq!(verdict.status, Status::Warning);
    assert_eq!(verdict.message, "10 days left");
}

fn pkcs12_file(pki: &Pki, pass: &str) -> tempfile::NamedTempFile {
    let certs = vec![
        p12_keystore::Certificate::from_der(pki.leaf.der().as_ref()).unwrap(),
        p12_keystore::Certificate::from_der(pki.intermediate.der().as_ref()).unwrap(),
    ];
    let chain = p12_keystore::PrivateKeyChain::new(pki.leaf.key.serialize_der(), b"leaf", certs);
    let mut keystore = p12_keystore::KeyStore::new();
    keystore.add_entry("leaf", p12_keystore::KeyStoreEntry::PrivateKeyChain(chain));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&keystore.writer(pass).write().unwrap()).unwrap();
    file
}

#[tokio::test]
async fn test_cert_from_pkcs12_file() {
    let pki = expiring_pki();
    let file = pkcs12_file(&pki, "secret");

    let options = CertOptions {
        pkcs12: Some(file.path().to_path_buf()),
        pass: Some("secret".to_string()),
        warning: 8,
        critical: 5,
        ..CertOptions::default()
    };
    let verdict = CertCheck::new(options, &settings())
        .unwrap()
        .with_clock(frozen_clock())
        .run()
        .await;

    assert_eq!(verdict.status, Status::Ok);
    assert_eq!(verdict.message, "10 days left");
}

#[tokio::test]
async fn test_cert_pkcs12_wrong_pass_is_unknown() {
    let pki = expiring_pki();
    let file = pkcs12_file(&pki, "secret");

    let options = CertOptions {
        pkcs12: Some(file.path().to_path_buf()),
        pass: Some("wrong".to_string()),
        warning: 8,
        critical: 5,
        ..CertOptions::default()
    };
    let verdict = CertCheck::new(options, &settings()).unwrap().run().await;
    assert_eq!(verdict.status, Status::Unknown);
}

#[tokio::test]
async fn test_cert_pkcs12_validation_messages() {
    let pki = expiring_pki();
    let file = pkcs12_file(&pki, "secret");

    let options = CertOptions {
        pkcs12: Some(file.path().to_path_buf()),
        warning: 8,
        critical: 5,
        ..CertOptions::default()
    };
    let err = CertCheck::new(options, &settings()).err().unwrap();
    assert_eq!(err.to_string(), "No pass phrase specified for PKCS#12 certificate");

    let options = CertOptions {
        pkcs12: Some(file.path().with_extension("missing")),
        pass: Some("secret".to_string()),
        warning: 8,
        critical: 5,
        ..CertOptions::default()
    };
    let err = CertCheck::new(options, &settings()).err().unwrap();
    assert_eq!(err.to_string(), "No such cert");
}

#[tokio::test]
async fn test_cert_from_remote_leaf() {
    let pki = expiring_pki();
    let (addr, _server) = spawn_tls_server(pki.server_config(), false).await;

    let options = CertOptions {
        host: Some("127.0.0.1".to_string()),
        port: Some(addr.port()),
        servername: Some("localhost".to_string()),
        warning: 8,
        critical: 5,
        ..CertOptions::default()
    };
    let verdict = CertCheck::new(options, &settings())
        .unwrap()
        .with_clock(frozen_clock())
        .run()
        .await;

    assert_eq!(verdict.status, Status::Ok);
    assert_eq!(verdict.message, "10 days left");
}

#[tokio::test]
async fn test_anchor_found_and_mismatched() {
    let pki = Pki::new(None);

    let (addr, _server) = spawn_tls_server(pki.server_config(), false).await;
    let options = AnchorOptions {
        port: addr.port(),
        servername: Some("localhost".to_string()),
        ..AnchorOptions::new("127.0.0.1", "i:O = Example, CN = Test Root CA")
    };
    let verdict = anchor::run(options, &settings()).await;
    assert_eq!(verdict.status, Status::Ok);
    assert_eq!(verdict.message, "Root anchor has been found.");

    let (addr, _server) = spawn_tls_server(pki.server_config(), false).await;
    let options = AnchorOptions {
        port: addr.port(),
        ..AnchorOptions::new("127.0.0.1", "i:O = Digital Signature Trust Co., CN = DST Root CA X3")
    };
    let verdict = anchor::run(options, &settings()).await;
    assert_eq!(verdict.status, Status::Critical);
    assert_eq!(
        verdict.message,
        "Root anchor did not match. Found \"i:O = Example, CN = Test Root CA\" instead."
    );
}

#[tokio::test]
async fn test_root_issuer_with_custom_store() {
    let pki = Pki::new(None);
    let (addr, _server) = spawn_tls_server(pki.server_config(), false).await;
    let mut bundle = tempfile::NamedTempFile::new().unwrap();
    bundle.write_all(pki.root.pem().as_bytes()).unwrap();

    let options = RootIssuerOptions {
        ca_file: Some(bundle.path().to_path_buf()),
        ..RootIssuerOptions::new(
            format!("https://localhost:{}/", addr.port()),
            "CN=Test Root CA,O=Example",
        )
    };
    let verdict = root_issuer::run(options, &settings()).await;
    assert_eq!(verdict.status, Status::Ok);
    assert_eq!(
        verdict.message,
        "Root certificate in chain has expected issuer name"
    );
}

#[tokio::test]
async fn test_root_issuer_requires_https() {
    let verdict = root_issuer::run(
        RootIssuerOptions::new("http://example.com", "CN=Anything"),
        &settings(),
    )
    .await;
    assert_eq!(verdict.status, Status::Critical);
    assert_eq!(
        verdict.message,
        "url protocol must be https, you specified http://example.com/"
    );
}
