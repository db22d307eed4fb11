//! Utility modules for ssl-checks
//!
//! This module contains error types and the clock collaborator.

pub mod clock;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    CertificateError, ChainError, CheckError, ConfigError, ConnectionError, HttpError,
    RatingError, Result,
};
