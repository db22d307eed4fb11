//! Data models for ssl-checks
//!
//! This module contains the data structures shared by the checks.

pub mod anchor;
pub mod certificate;
pub mod crl;
pub mod rating;
pub mod verdict;

pub use anchor::{AnchorSpec, MatchMode};
pub use certificate::{Certificate, CertificateChain, DistinguishedName, NameAttribute, NameFormat};
pub use crl::RevocationList;
pub use rating::{Grade, JobStatus, RatingJob};
pub use verdict::{Status, Verdict};
