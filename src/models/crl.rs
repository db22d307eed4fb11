//! Certificate revocation list model

use super::certificate::{asn1_time_to_datetime, is_pem, DistinguishedName};
use crate::utils::CertificateError;
use chrono::{DateTime, Utc};
use x509_parser::prelude::*;

/// The parts of a CRL that freshness checks look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationList {
    issuer: DistinguishedName,
    this_update: DateTime<Utc>,
    next_update: Option<DateTime<Utc>>,
    revoked: usize,
}

impl RevocationList {
    /// Parse a CRL given as DER or as a PEM `X509 CRL` block
    pub fn parse(data: &[u8]) -> Result<Self, CertificateError> {
        if is_pem(data) {
            let block = ::pem::parse_many(data)
                .map_err(|e| CertificateError::CrlParseError {
                    message: e.to_string(),
                })?
                .into_iter()
                .find(|block| block.tag() == "X509 CRL")
                .ok_or_else(|| CertificateError::CrlParseError {
                    message: "no X509 CRL block found".to_string(),
                })?;
            Self::from_der(block.contents())
        } else {
            Self::from_der(data)
        }
    }

    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, crl) =
            CertificateRevocationList::from_der(der).map_err(|e| CertificateError::CrlParseError {
                message: format!("{:?}", e),
            })?;

        Ok(Self {
            issuer: DistinguishedName::from_x509(crl.issuer()),
            this_update: asn1_time_to_datetime(crl.last_update())?,
            next_update: crl.next_update().map(asn1_time_to_datetime).transpose()?,
            revoked: crl.iter_revoked_certificates().count(),
        })
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn this_update(&self) -> DateTime<Utc> {
        self.this_update
    }

    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked
    }

    /// Whole minutes from `now` until the next update, truncated toward zero
    pub fn minutes_until_next_update(&self, now: DateTime<Utc>) -> Result<i64, CertificateError> {
        let next_update = self.next_update.ok_or(CertificateError::MissingNextUpdate)?;
        Ok((next_update - now).num_seconds() / 60)
    }
}
