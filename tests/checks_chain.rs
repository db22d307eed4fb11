//! Chain validation over generated certificate hierarchies

mod common;

use common::{intermediate_ca, leaf, root_ca, Pki};
use ssl_checks::checks::chain::{chain_line, verify_signatures};
use ssl_checks::checks::ChainTrustValidator;
use ssl_checks::models::{AnchorSpec, CertificateChain, MatchMode, NameFormat};
use ssl_checks::utils::ChainError;

fn chain_of(certs: &[&common::Issued]) -> CertificateChain {
    CertificateChain::new(certs.iter().map(|c| c.parsed()).collect())
}

#[test]
fn test_valid_three_certificate_chain() {
    let pki = Pki::new(None);
    let chain = chain_of(&[&pki.leaf, &pki.intermediate, &pki.root]);

    assert!(verify_signatures(&chain).is_ok());
    assert!(ChainTrustValidator::new()
        .hostname("localhost")
        .signatures(true)
        .validate(&chain)
        .is_ok());
}

#[test]
fn test_unrelated_parent_breaks_the_link() {
    let pki = Pki::new(None);
    let stranger = root_ca("Unrelated Root CA");
    // The intermediate was not signed by the stranger
    let chain = chain_of(&[&pki.leaf, &pki.intermediate, &stranger]);

    match verify_signatures(&chain) {
        Err(ChainError::ChainInvalid { broken_links }) => assert_eq!(broken_links, vec![1]),
        other => panic!("expected ChainInvalid, got {:?}", other),
    }
}

#[test]
fn test_single_certificate_chain_has_no_links() {
    let pki = Pki::new(None);
    assert!(verify_signatures(&chain_of(&[&pki.leaf])).is_ok());
}

#[test]
fn test_hostname_validation() {
    let root = root_ca("Test Root CA");
    let wildcard = leaf(&["*.example.com"], &root, None);
    let chain = chain_of(&[&wildcard, &root]);

    assert!(ChainTrustValidator::new()
        .hostname("www.example.com")
        .validate(&chain)
        .is_ok());

    match ChainTrustValidator::new()
        .hostname("example.org")
        .validate(&chain)
    {
        Err(ChainError::HostnameMismatch { hostname, .. }) => assert_eq!(hostname, "example.org"),
        other => panic!("expected HostnameMismatch, got {:?}", other),
    }
}

#[test]
fn test_identity_is_checked_before_signatures() {
    let pki = Pki::new(None);
    let stranger = root_ca("Unrelated Root CA");
    let chain = chain_of(&[&pki.leaf, &pki.intermediate, &stranger]);

    let result = ChainTrustValidator::new()
        .hostname("other.example")
        .signatures(true)
        .validate(&chain);
    assert!(matches!(result, Err(ChainError::HostnameMismatch { .. })));
}

#[test]
fn test_anchor_line_of_presented_chain() {
    let pki = Pki::new(None);
    // A server that omits the root: the anchor line names the root as issuer
    let chain = chain_of(&[&pki.leaf, &pki.intermediate]);
    let outermost = chain.outermost().unwrap();

    assert_eq!(
        chain_line(outermost, NameFormat::Oneline),
        "i:O = Example, CN = Test Root CA"
    );
    assert_eq!(
        chain_line(outermost, NameFormat::Rfc2253),
        "i:CN=Test Root CA,O=Example"
    );

    let literal = AnchorSpec::literal("i:O = Example, CN = Test Root CA", NameFormat::Oneline);
    assert!(ChainTrustValidator::new().anchor(literal).validate(&chain).is_ok());

    let pattern = AnchorSpec::new("Test Root", MatchMode::Pattern, NameFormat::Oneline).unwrap();
    assert!(ChainTrustValidator::new().anchor(pattern).validate(&chain).is_ok());
}

#[test]
fn test_anchor_mismatch_reports_found_line() {
    let root = root_ca("Test Root CA");
    let intermediate = intermediate_ca("Test Intermediate CA", &root);
    let chain = chain_of(&[&intermediate]);

    // Literal comparison is exact, a substring is not enough
    let anchor = AnchorSpec::literal("CN = Test Root CA", NameFormat::Oneline);
    match ChainTrustValidator::new().anchor(anchor).validate(&chain) {
        Err(ChainError::AnchorMismatch { found, .. }) => {
            assert_eq!(found, "i:O = Example, CN = Test Root CA")
        }
        other => panic!("expected AnchorMismatch, got {:?}", other),
    }
}
