//! Command implementations for ssl-checks
//!
//! One module per monitoring check. Each validates its options before any
//! network I/O and exposes `run(...) -> Verdict`.

pub mod anchor;
pub mod cert;
pub mod crl;
pub mod host;
pub mod hsts;
pub mod qualys;
pub mod root_issuer;

use crate::checks::{ClientIdentity, StarttlsProtocol};
use crate::utils::ConfigError;
use std::path::Path;

/// Read a file named on the command line
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|e| ConfigError::InvalidValue {
        key: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Load a client identity. The key defaults to the certificate file, for
/// PEM bundles holding both.
pub(crate) fn load_identity(
    cert: Option<&Path>,
    key: Option<&Path>,
) -> Result<Option<ClientIdentity>, ConfigError> {
    match (cert, key) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(ConfigError::MissingRequired {
            message: "--client-key requires --client-cert".to_string(),
        }),
        (Some(cert), key) => {
            let cert_data = read_file(cert)?;
            let key_data = read_file(key.unwrap_or(cert))?;
            ClientIdentity::from_pem_or_der(&cert_data, &key_data).map(Some)
        }
    }
}

/// Parse an optional STARTTLS protocol name
pub(crate) fn parse_starttls(protocol: Option<&str>) -> Result<Option<StarttlsProtocol>, ConfigError> {
    protocol.map(str::parse).transpose()
}
