//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ssl-checks")]
#[command(version)]
#[command(about = "Monitoring checks for TLS certificates, chains, CRLs and ratings", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (TOML); defaults to config/default.toml when present
    #[arg(long, global = true, value_name = "FILE", env = "SSL_CHECKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check hostname, chain signatures and expiry of a live endpoint
    Host(HostArgs),

    /// Check expiry of a remote or PEM certificate
    Cert(CertArgs),

    /// Check that the presented chain ends at an expected root
    Anchor(AnchorArgs),

    /// Check the issuer of the trust-store root anchoring a URL
    RootIssuer(RootIssuerArgs),

    /// Check minutes until a CRL's next update
    Crl(CrlArgs),

    /// Check the SSL Labs rating of a domain
    Qualys(QualysArgs),

    /// Check a domain's HSTS preload status
    HstsStatus(HstsStatusArgs),

    /// Check whether a domain can be HSTS preloaded
    HstsPreloadable(HstsPreloadableArgs),
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Hostname of the certificate to check, also the connection target
    #[arg(short = 'H', long)]
    pub host: String,

    #[arg(short, long, default_value = "443")]
    pub port: u16,

    /// Address to connect to instead of the host
    #[arg(short, long)]
    pub address: Option<String>,

    /// Client certificate (PEM or DER)
    #[arg(long, value_name = "CERT")]
    pub client_cert: Option<PathBuf>,

    /// Client private key (PEM); defaults to the certificate file
    #[arg(long, value_name = "KEY")]
    pub client_key: Option<PathBuf>,

    /// Negotiate STARTTLS first (smtp, imap)
    #[arg(long, value_name = "PROTO")]
    pub starttls: Option<String>,

    #[arg(long)]
    pub skip_hostname_verification: bool,

    #[arg(long)]
    pub skip_chain_verification: bool,

    /// Warning this many days before expiry
    #[arg(short, long, default_value = "14")]
    pub warning: i64,

    /// Critical this many days before expiry
    #[arg(short, long, default_value = "7")]
    pub critical: i64,
}

#[derive(Args, Debug)]
pub struct CertArgs {
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// TLS SNI name, defaults to the host
    #[arg(short, long, value_name = "SERVER")]
    pub servername: Option<String>,

    /// Local PEM or DER certificate instead of a remote endpoint
    #[arg(short = 'P', long)]
    pub pem: Option<PathBuf>,

    /// Local PKCS#12 archive instead of a remote endpoint
    #[arg(short = 'C', long = "cert", value_name = "P12")]
    pub pkcs12: Option<PathBuf>,

    /// Pass phrase for the PKCS#12 archive
    #[arg(short = 'S', long)]
    pub pass: Option<String>,

    /// Negotiate STARTTLS first (smtp, imap)
    #[arg(long, value_name = "PROTO")]
    pub starttls: Option<String>,

    /// Warning when fewer days are left
    #[arg(short, long)]
    pub warning: i64,

    /// Critical when fewer days are left
    #[arg(short, long)]
    pub critical: i64,
}

#[derive(Args, Debug)]
pub struct AnchorArgs {
    #[arg(short = 'H', long)]
    pub host: String,

    #[arg(short, long, default_value = "443")]
    pub port: u16,

    /// TLS SNI name, defaults to the host
    #[arg(short, long, value_name = "SERVER")]
    pub servername: Option<String>,

    /// Expected last chain line, e.g. "i:O = Digital Signature Trust Co., CN = DST Root CA X3"
    #[arg(short, long, value_name = "ANCHOR")]
    pub anchor: String,

    /// Treat the anchor as a regular expression
    #[arg(short, long)]
    pub regexp: bool,

    /// Name format: RFC2253, ONELINE or COMPAT
    #[arg(short, long, default_value = "ONELINE")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct RootIssuerArgs {
    /// URL to check, e.g. https://example.com
    #[arg(short, long)]
    pub url: String,

    /// Expected issuer name, e.g. "CN=DST Root CA X3,O=Digital Signature Trust Co."
    #[arg(short, long, value_name = "ISSUER_NAME")]
    pub issuer: String,

    /// Treat the issuer name as a regular expression
    #[arg(short, long)]
    pub regexp: bool,

    /// Name format: RFC2253, ONELINE or COMPAT
    #[arg(short, long, default_value = "RFC2253")]
    pub format: String,

    /// PEM bundle to trust instead of the system store
    #[arg(long, value_name = "FILE")]
    pub ca_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CrlArgs {
    /// URL or path of the CRL (DER or PEM)
    #[arg(short, long)]
    pub url: String,

    /// Warning when fewer minutes are left
    #[arg(short, long)]
    pub warning: i64,

    /// Critical when fewer minutes are left
    #[arg(short, long)]
    pub critical: i64,
}

#[derive(Args, Debug)]
pub struct QualysArgs {
    #[arg(short, long)]
    pub domain: String,

    /// API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Warning if rated below this grade
    #[arg(short, long, value_name = "GRADE", default_value = "A-")]
    pub warn: String,

    /// Critical if rated below this grade
    #[arg(short, long, value_name = "GRADE", default_value = "B")]
    pub critical: String,

    /// Number of polls before giving up
    #[arg(short, long = "number-checks", value_name = "NUM_CHECKS")]
    pub num_checks: Option<u32>,

    /// Minimum seconds between polls; a longer server ETA takes precedence
    #[arg(short = 't', long = "time-between", value_name = "SECONDS")]
    pub between_checks: Option<u64>,

    /// Overall time limit in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct HstsStatusArgs {
    #[arg(short, long)]
    pub domain: String,

    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Warning at this status or worse (unknown, pending, preloaded)
    #[arg(short, long, value_name = "STATUS", default_value = "pending")]
    pub warn: String,

    /// Critical at this status or worse
    #[arg(short, long, value_name = "STATUS", default_value = "unknown")]
    pub critical: String,
}

#[derive(Args, Debug)]
pub struct HstsPreloadableArgs {
    #[arg(short, long)]
    pub domain: String,

    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}
