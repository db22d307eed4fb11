//! Certificate chain trust validation
//!
//! Three independent checks over a presented chain: the leaf's identity for
//! a hostname, signature links between neighbouring certificates, and the
//! outermost certificate against an expected anchor. This does NOT validate
//! trust anchoring against a root store; see [`super::trust_store`] for that.

use crate::models::{AnchorSpec, Certificate, CertificateChain, NameFormat};
use crate::utils::ChainError;
use std::net::IpAddr;
use tracing::debug;

/// Which chain checks to run
#[derive(Debug, Clone, Default)]
pub struct ChainTrustValidator {
    hostname: Option<String>,
    verify_signatures: bool,
    anchor: Option<AnchorSpec>,
}

impl ChainTrustValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the leaf to be valid for `hostname`
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Require every link of the chain to verify
    pub fn signatures(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    /// Require the outermost certificate's chain line to match `anchor`
    pub fn anchor(mut self, anchor: AnchorSpec) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Run the configured checks in order: identity, signatures, anchor
    pub fn validate(&self, chain: &CertificateChain) -> Result<(), ChainError> {
        let leaf = chain.leaf().ok_or(ChainError::EmptyChain)?;

        if let Some(hostname) = &self.hostname {
            verify_hostname(leaf, hostname)?;
        }
        if self.verify_signatures {
            verify_signatures(chain)?;
        }
        if let Some(anchor) = &self.anchor {
            verify_anchor(chain, anchor)?;
        }
        Ok(())
    }
}

/// Check the leaf certificate is valid for `hostname`
pub fn verify_hostname(leaf: &Certificate, hostname: &str) -> Result<(), ChainError> {
    if matches_hostname(leaf, hostname) {
        debug!(hostname, "leaf certificate matches hostname");
        Ok(())
    } else {
        Err(ChainError::HostnameMismatch {
            hostname: hostname.to_string(),
            subject: leaf.subject().to_string(),
        })
    }
}

/// RFC 6125 identity matching.
///
/// DNS SANs take precedence and the subject CN is only consulted when the
/// certificate carries none. IP targets only match IP SANs.
pub fn matches_hostname(cert: &Certificate, hostname: &str) -> bool {
    let host = hostname.trim_end_matches('.').to_ascii_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = bare.parse::<IpAddr>() {
        return cert.ip_addresses().contains(&ip);
    }

    if !cert.dns_names().is_empty() {
        return cert
            .dns_names()
            .iter()
            .any(|pattern| matches_dns_pattern(pattern, &host));
    }

    cert.subject()
        .common_name()
        .map(|cn| matches_dns_pattern(cn, &host))
        .unwrap_or(false)
}

fn matches_dns_pattern(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        // The wildcard covers exactly one non-empty label and never a
        // public suffix on its own
        Some(suffix) => {
            if !suffix.contains('.') || suffix.contains('*') {
                return false;
            }
            match host.split_once('.') {
                Some((label, rest)) => !label.is_empty() && rest == suffix,
                None => false,
            }
        }
        None => !pattern.contains('*') && pattern == host,
    }
}

/// Walk the chain from the outermost certificate toward the leaf and verify
/// each child was signed by its parent. The outermost certificate has no
/// parent and is accepted as-is.
///
/// Assumes the peer presented the chain leaf-first.
pub fn verify_signatures(chain: &CertificateChain) -> Result<(), ChainError> {
    let certs = chain.certificates();
    let mut broken_links = Vec::new();

    for child_index in (0..certs.len().saturating_sub(1)).rev() {
        let parent = &certs[child_index + 1];
        let child = &certs[child_index];
        let valid = child.verify_signed_by(parent);
        debug!(
            child = %child.subject(),
            parent = %parent.subject(),
            valid,
            "verified chain link"
        );
        if !valid {
            broken_links.push(child_index);
        }
    }

    if broken_links.is_empty() {
        Ok(())
    } else {
        Err(ChainError::ChainInvalid { broken_links })
    }
}

/// The line `openssl s_client` prints last for a presented chain: the
/// outermost certificate's issuer, prefixed with `i:`
pub fn chain_line(cert: &Certificate, format: NameFormat) -> String {
    format!("i:{}", cert.issuer().format(format))
}

/// Compare the outermost certificate's chain line against `anchor`
pub fn verify_anchor(chain: &CertificateChain, anchor: &AnchorSpec) -> Result<(), ChainError> {
    let outermost = chain.outermost().ok_or(ChainError::EmptyChain)?;
    match_anchor(&chain_line(outermost, anchor.format()), anchor)
}

/// Compare an already formatted name or line against `anchor`
pub fn match_anchor(found: &str, anchor: &AnchorSpec) -> Result<(), ChainError> {
    if anchor.matches(found) {
        Ok(())
    } else {
        Err(ChainError::AnchorMismatch {
            expected: anchor.value().to_string(),
            found: found.to_string(),
        })
    }
}
