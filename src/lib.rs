//! ssl-checks Library
//!
//! Monitoring checks for TLS endpoints:
//! - Certificate chain acquisition, optionally after STARTTLS
//! - Hostname, chain signature and root anchor validation
//! - Certificate and CRL expiry thresholds
//! - SSL Labs rating polling and HSTS preload lookups
//!
//! Every check produces a [`models::Verdict`]; mapping it to a process exit
//! code is left to the binary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ssl_checks::commands::host::{self, HostOptions};
//! use ssl_checks::config::Settings;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::default();
//!     let verdict = host::run(HostOptions::new("example.com"), &settings.connection).await;
//!     println!("{}", verdict);
//! }
//! ```

pub mod checks;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod runner;
pub mod utils;

// Re-export commonly used types
pub use cli::Cli;
pub use config::Settings;
pub use models::{Status, Verdict};
pub use runner::{run_command, CheckReport};
pub use utils::{CheckError, Result};
