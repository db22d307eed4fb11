//! Certificate data models
//!
//! [`Certificate`] owns the DER encoding of one X.509 certificate together
//! with the fields the checks look at. Names keep their RDN structure so they
//! can be rendered in any of the conventional OpenSSL serializations.

use crate::utils::{CertificateError, ConfigError};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::str::FromStr;
use x509_parser::prelude::*;

/// X.509 name serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameFormat {
    /// `CN=Leaf,O=Example` (reversed RDN order, RFC 2253 escaping)
    Rfc2253,
    /// `O = Example, CN = Leaf`
    Oneline,
    /// `O=Example, CN=Leaf`
    Compat,
}

const NAME_FORMATS: &[(&str, NameFormat)] = &[
    ("RFC2253", NameFormat::Rfc2253),
    ("ONELINE", NameFormat::Oneline),
    ("COMPAT", NameFormat::Compat),
];

impl NameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameFormat::Rfc2253 => "RFC2253",
            NameFormat::Oneline => "ONELINE",
            NameFormat::Compat => "COMPAT",
        }
    }
}

impl FromStr for NameFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NAME_FORMATS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, format)| *format)
            .ok_or_else(|| ConfigError::InvalidNameFormat {
                format: s.to_string(),
            })
    }
}

impl std::fmt::Display for NameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute of a relative distinguished name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameAttribute {
    pub short_name: String,
    pub value: String,
}

/// Distinguished name in encoding order (most significant RDN first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    pub rdns: Vec<Vec<NameAttribute>>,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl DistinguishedName {
    pub(crate) fn from_x509(name: &X509Name) -> Self {
        let rdns = name
            .iter()
            .map(|rdn| {
                rdn.iter()
                    .map(|attr| NameAttribute {
                        short_name: short_name(&attr.attr_type().to_id_string()),
                        value: attr
                            .as_str()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|_| hex_value(attr.attr_value().data)),
                    })
                    .collect()
            })
            .collect();

        Self {
            rdns,
            raw: name.as_raw().to_vec(),
        }
    }

    /// DER encoding of the name, for exact comparison
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// First common name attribute, if any
    pub fn common_name(&self) -> Option<&str> {
        self.rdns
            .iter()
            .flatten()
            .find(|attr| attr.short_name == "CN")
            .map(|attr| attr.value.as_str())
    }

    /// Render the name in the requested serialization
    pub fn format(&self, format: NameFormat) -> String {
        match format {
            NameFormat::Rfc2253 => self
                .rdns
                .iter()
                .rev()
                .map(|rdn| join_rdn(rdn, "=", "+", |v| escape_value(v, false)))
                .collect::<Vec<_>>()
                .join(","),
            NameFormat::Oneline => self
                .rdns
                .iter()
                .map(|rdn| join_rdn(rdn, " = ", " + ", |v| escape_value(v, true)))
                .collect::<Vec<_>>()
                .join(", "),
            NameFormat::Compat => self
                .rdns
                .iter()
                .map(|rdn| join_rdn(rdn, "=", "+", |v| v.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format(NameFormat::Compat))
    }
}

fn join_rdn(
    rdn: &[NameAttribute],
    equals: &str,
    plus: &str,
    render: impl Fn(&str) -> String,
) -> String {
    rdn.iter()
        .map(|attr| format!("{}{}{}", attr.short_name, equals, render(&attr.value)))
        .collect::<Vec<_>>()
        .join(plus)
}

/// Escape an attribute value the way OpenSSL does for RFC 2253 output.
/// With `quote` set, special characters cause the whole value to be quoted
/// instead of being backslash-escaped.
fn escape_value(value: &str, quote: bool) -> String {
    let mut out = String::with_capacity(value.len());
    let mut needs_quotes = false;
    let count = value.chars().count();

    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '<' | '>' | ';')
            || (c == '#' && i == 0)
            || (c == ' ' && (i == 0 || i + 1 == count));

        if c == '"' || c == '\\' {
            out.push('\\');
            out.push(c);
        } else if special {
            if quote {
                needs_quotes = true;
            } else {
                out.push('\\');
            }
            out.push(c);
        } else if c.is_ascii_control() {
            out.push_str(&format!("\\{:02X}", c as u32));
        } else if !c.is_ascii() {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("\\{:02X}", b));
            }
        } else {
            out.push(c);
        }
    }

    if needs_quotes {
        format!("\"{}\"", out)
    } else {
        out
    }
}

fn hex_value(data: &[u8]) -> String {
    let mut out = String::from("#");
    for b in data {
        out.push_str(&format!("{:02X}", b));
    }
    out
}

/// OpenSSL short names for the attribute types found in practice
fn short_name(oid: &str) -> String {
    match oid {
        "2.5.4.3" => "CN",
        "2.5.4.4" => "SN",
        "2.5.4.5" => "serialNumber",
        "2.5.4.6" => "C",
        "2.5.4.7" => "L",
        "2.5.4.8" => "ST",
        "2.5.4.9" => "street",
        "2.5.4.10" => "O",
        "2.5.4.11" => "OU",
        "2.5.4.12" => "title",
        "2.5.4.15" => "businessCategory",
        "2.5.4.17" => "postalCode",
        "2.5.4.42" => "GN",
        "2.5.4.97" => "organizationIdentifier",
        "1.2.840.113549.1.9.1" => "emailAddress",
        "0.9.2342.19200300.100.1.1" => "UID",
        "0.9.2342.19200300.100.1.25" => "DC",
        "1.3.6.1.4.1.311.60.2.1.3" => "jurisdictionC",
        other => other,
    }
    .to_string()
}

/// A parsed, immutable X.509 certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    public_key: Vec<u8>,
}

impl Certificate {
    /// Parse a DER-encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| CertificateError::ParseError {
                message: format!("{:?}", e),
            })?;

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                    GeneralName::IPAddress(ip) => {
                        if let Some(addr) = ip_from_bytes(ip) {
                            ip_addresses.push(addr);
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            der: der.to_vec(),
            subject: DistinguishedName::from_x509(cert.subject()),
            issuer: DistinguishedName::from_x509(cert.issuer()),
            not_before: asn1_time_to_datetime(cert.validity().not_before)?,
            not_after: asn1_time_to_datetime(cert.validity().not_after)?,
            dns_names,
            ip_addresses,
            public_key: cert.public_key().raw.to_vec(),
        })
    }

    /// Parse every `CERTIFICATE` block of a PEM document
    pub fn from_pem(pem_data: &[u8]) -> Result<Vec<Self>, CertificateError> {
        let blocks = ::pem::parse_many(pem_data).map_err(|e| CertificateError::ParseError {
            message: e.to_string(),
        })?;

        let certs = blocks
            .iter()
            .filter(|block| block.tag() == "CERTIFICATE")
            .map(|block| Self::from_der(block.contents()))
            .collect::<Result<Vec<_>, _>>()?;

        if certs.is_empty() {
            return Err(CertificateError::ParseError {
                message: "no CERTIFICATE block found".to_string(),
            });
        }
        Ok(certs)
    }

    /// Parse a certificate file given either as PEM or as a single DER
    /// certificate
    pub fn from_pem_or_der(data: &[u8]) -> Result<Vec<Self>, CertificateError> {
        if is_pem(data) {
            Self::from_pem(data)
        } else {
            Ok(vec![Self::from_der(data)?])
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    /// DER-encoded SubjectPublicKeyInfo
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject.raw() == self.issuer.raw()
    }

    /// Whole calendar days from `now` until expiry; negative once expired
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after.date_naive() - now.date_naive()).num_days()
    }

    /// Whether this certificate's signature verifies with `parent`'s key
    pub fn verify_signed_by(&self, parent: &Certificate) -> bool {
        self.verify_signed_by_key(parent.public_key())
    }

    /// Whether this certificate's signature verifies with a DER-encoded
    /// SubjectPublicKeyInfo
    pub fn verify_signed_by_key(&self, spki_der: &[u8]) -> bool {
        let Ok((_, cert)) = X509Certificate::from_der(&self.der) else {
            return false;
        };
        let Ok((_, key)) = SubjectPublicKeyInfo::from_der(spki_der) else {
            return false;
        };
        cert.verify_signature(Some(&key)).is_ok()
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        _ => None,
    }
}

/// Convert ASN.1 time to chrono DateTime
/// Whether `data` looks like PEM armour rather than raw DER
pub(crate) fn is_pem(data: &[u8]) -> bool {
    data.trim_ascii_start().starts_with(b"-----BEGIN")
}

pub(crate) fn asn1_time_to_datetime(time: ASN1Time) -> Result<DateTime<Utc>, CertificateError> {
    Utc.timestamp_opt(time.timestamp(), 0)
        .single()
        .ok_or(CertificateError::InvalidTimestamp)
}

/// Certificates in the order the peer presented them, leaf first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
}

impl CertificateChain {
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }

    /// Parse a list of DER certificates without reordering them
    pub fn from_der_list<T: AsRef<[u8]>>(ders: &[T]) -> Result<Self, CertificateError> {
        let certificates = ders
            .iter()
            .map(|der| Certificate::from_der(der.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { certificates })
    }

    /// The endpoint's own certificate
    pub fn leaf(&self) -> Option<&Certificate> {
        self.certificates.first()
    }

    /// The root, or highest certificate the peer presented
    pub fn outermost(&self) -> Option<&Certificate> {
        self.certificates.last()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }
}
