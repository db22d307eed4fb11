//! Custom error types for ssl-checks
//!
//! Every failure a check can run into is one of the enums below. The
//! top-level [`CheckError`] knows which monitoring status each failure
//! surfaces as, so commands never re-derive that mapping.

use crate::models::Status;
use thiserror::Error;

/// Top-level error type for all checks
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Rating(#[from] RatingError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// Status this failure is reported with.
    ///
    /// Configuration problems are UNKNOWN and never retried. Transport,
    /// negotiation and trust failures are CRITICAL. A remote rating job that
    /// could not be evaluated is a WARNING, while a domain without any rated
    /// endpoint is CRITICAL.
    pub fn status(&self) -> Status {
        match self {
            CheckError::Config(_) => Status::Unknown,
            CheckError::Connection(_) => Status::Critical,
            CheckError::Chain(_) => Status::Critical,
            CheckError::Certificate(_) => Status::Unknown,
            CheckError::Rating(RatingError::UnratedDomain { .. }) => Status::Critical,
            CheckError::Rating(_) => Status::Warning,
            CheckError::Http(_) => Status::Warning,
            CheckError::Io(_) => Status::Unknown,
        }
    }
}

/// Configuration errors, detected before any network I/O
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("warning cannot be less than critical")]
    InvertedThresholds { warning: i64, critical: i64 },

    #[error("warning grade {warning} cannot be worse than critical grade {critical}")]
    InvertedGrades { warning: String, critical: String },

    #[error("Unsupported StartTLS protocol {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("Invalid name format {format}, expected one of RFC2253, ONELINE, COMPAT")]
    InvalidNameFormat { format: String },

    #[error("Invalid pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid grade {grade}")]
    InvalidGrade { grade: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid client identity: {message}")]
    InvalidIdentity { message: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("{message}")]
    MissingRequired { message: String },
}

/// Transport, STARTTLS and TLS handshake errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {target}: {message}")]
    Connect { target: String, message: String },

    #[error("Connection reset by {target}: {message}")]
    Reset { target: String, message: String },

    #[error("{stage} timed out for {target}")]
    Timeout { target: String, stage: String },

    #[error("did not receive expected {protocol} STARTTLS response, got {response:?}")]
    StartTlsNegotiationFailed { protocol: String, response: String },

    #[error("TLS handshake with {target} failed: {message}")]
    Handshake { target: String, message: String },

    #[error("Invalid server name: {name}")]
    InvalidServerName { name: String },

    #[error("TLS configuration error: {message}")]
    Tls { message: String },

    #[error("No certificates received from {target}")]
    NoCertificates { target: String },
}

impl ConnectionError {
    /// Classify an I/O error raised while talking to `target`
    pub fn from_io(target: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionReset => ConnectionError::Reset {
                target: target.to_string(),
                message: err.to_string(),
            },
            _ => ConnectionError::Connect {
                target: target.to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Chain trust errors: identity, signatures, anchors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("{hostname} hostname mismatch ({subject})")]
    HostnameMismatch { hostname: String, subject: String },

    #[error("Invalid certificate chain")]
    ChainInvalid { broken_links: Vec<usize> },

    #[error("Anchor did not match. Found \"{found}\", expected \"{expected}\"")]
    AnchorMismatch { expected: String, found: String },

    #[error("Certificate verification failed. Reason: {code} {description}")]
    VerificationFailed { code: String, description: String },

    #[error("Empty certificate chain")]
    EmptyChain,
}

/// Certificate and CRL parsing errors
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Failed to parse certificate: {message}")]
    ParseError { message: String },

    #[error("Failed to parse CRL: {message}")]
    CrlParseError { message: String },

    #[error("CRL has no next update time")]
    MissingNextUpdate,

    #[error("Invalid timestamp in certificate")]
    InvalidTimestamp,
}

/// Remote rating job errors
#[derive(Error, Debug)]
pub enum RatingError {
    #[error("ERROR on {domain} check")]
    JobError { domain: String },

    #[error("Timeout waiting for check to finish after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    #[error("{domain} not rated")]
    UnratedDomain { domain: String },

    #[error("Bad response received from API: {message}")]
    BadResponse { message: String },

    #[error("Unknown grade {grade} returned for {domain}")]
    UnknownGrade { domain: String, grade: String },
}

/// HTTP collaborator errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Bad response received from {url}: status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Result type alias using CheckError
pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_unknown() {
        let err = CheckError::from(ConfigError::InvertedThresholds {
            warning: 1,
            critical: 5,
        });
        assert_eq!(err.status(), Status::Unknown);
        assert_eq!(err.to_string(), "warning cannot be less than critical");
    }

    #[test]
    fn test_rating_errors_split_between_warning_and_critical() {
        let unrated = CheckError::from(RatingError::UnratedDomain {
            domain: "example.com".to_string(),
        });
        let timeout = CheckError::from(RatingError::PollTimeout { attempts: 24 });
        assert_eq!(unrated.status(), Status::Critical);
        assert_eq!(timeout.status(), Status::Warning);
    }

    #[test]
    fn test_connection_reset_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = ConnectionError::from_io("example.com:443", io);
        assert!(matches!(err, ConnectionError::Reset { .. }));
        assert_eq!(CheckError::from(err).status(), Status::Critical);
    }
}
