//! Core check components
//!
//! Connection acquisition, chain trust validation, threshold evaluation and
//! rating polling, plus the collaborators they talk to.

pub mod chain;
pub mod connection;
pub mod hsts;
pub mod http;
pub mod rating;
pub mod starttls;
pub mod threshold;
pub mod trust_store;

pub use chain::ChainTrustValidator;
pub use connection::{ChainRequest, ClientIdentity, ConnectionAcquirer};
pub use hsts::{HstsClient, HstsStatus, PreloadableReport};
pub use http::{HttpFetch, HttpResponse, ReqwestFetcher};
pub use rating::{GradeThresholds, RatingConfig, RatingPoller};
pub use starttls::StarttlsProtocol;
pub use threshold::{evaluate, Standing, Thresholds, TimeUnit};
pub use trust_store::{TrustOutcome, TrustReport, TrustStore};
