//! Check orchestration
//!
//! Maps a parsed command onto its check and collects the verdict, so the
//! binary only has to print it and exit.

use crate::checks::{HttpFetch, ReqwestFetcher};
use crate::cli::Commands;
use crate::commands::{anchor, cert, crl, host, hsts, qualys, root_issuer};
use crate::config::Settings;
use crate::models::{Status, Verdict};
use crate::utils::{CheckError, Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Redirect hops followed when downloading a CRL
const CRL_MAX_REDIRECTS: usize = 10;

/// Verdict of one check run, labelled with the check's name
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub name: &'static str,
    pub verdict: Verdict,
}

impl CheckReport {
    pub fn status(&self) -> Status {
        self.verdict.status
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.verdict)
    }
}

/// The name a command reports under
pub fn check_name(command: &Commands) -> &'static str {
    match command {
        Commands::Host(_) => host::CHECK_NAME,
        Commands::Cert(_) => cert::CHECK_NAME,
        Commands::Anchor(_) => anchor::CHECK_NAME,
        Commands::RootIssuer(_) => root_issuer::CHECK_NAME,
        Commands::Crl(_) => crl::CHECK_NAME,
        Commands::Qualys(_) => qualys::CHECK_NAME,
        Commands::HstsStatus(_) => hsts::STATUS_CHECK_NAME,
        Commands::HstsPreloadable(_) => hsts::PRELOADABLE_CHECK_NAME,
    }
}

fn fetcher(max_redirects: usize, timeout: Duration) -> Result<Arc<dyn HttpFetch>, CheckError> {
    Ok(Arc::new(ReqwestFetcher::new(max_redirects, timeout)?))
}

/// Run the check selected by `command`
pub async fn run_command(command: Commands, settings: &Settings) -> CheckReport {
    let name = check_name(&command);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let verdict = match command {
        Commands::Host(args) => {
            let options = host::HostOptions {
                host: args.host,
                port: args.port,
                address: args.address,
                client_cert: args.client_cert,
                client_key: args.client_key,
                starttls: args.starttls,
                skip_hostname_verification: args.skip_hostname_verification,
                skip_chain_verification: args.skip_chain_verification,
                warning: args.warning,
                critical: args.critical,
            };
            host::run(options, &settings.connection).await
        }
        Commands::Cert(args) => {
            let options = cert::CertOptions {
                host: args.host,
                port: args.port,
                servername: args.servername,
                pem: args.pem,
                pkcs12: args.pkcs12,
                pass: args.pass,
                starttls: args.starttls,
                warning: args.warning,
                critical: args.critical,
            };
            cert::run(options, &settings.connection).await
        }
        Commands::Anchor(args) => {
            let options = anchor::AnchorOptions {
                host: args.host,
                port: args.port,
                servername: args.servername,
                anchor: args.anchor,
                regexp: args.regexp,
                format: args.format,
            };
            anchor::run(options, &settings.connection).await
        }
        Commands::RootIssuer(args) => {
            let options = root_issuer::RootIssuerOptions {
                url: args.url,
                issuer: args.issuer,
                regexp: args.regexp,
                format: args.format,
                ca_file: args.ca_file,
            };
            root_issuer::run(options, &settings.connection).await
        }
        Commands::Crl(args) => {
            let options = crl::CrlOptions {
                url: args.url,
                warning: args.warning,
                critical: args.critical,
            };
            match fetcher(CRL_MAX_REDIRECTS, settings.connection.handshake_timeout()) {
                Ok(http) => crl::run(options, http, clock).await,
                Err(e) => Verdict::from(e),
            }
        }
        Commands::Qualys(args) => {
            let options = qualys::QualysOptions {
                domain: args.domain,
                api_url: args.api_url,
                warn: args.warn,
                critical: args.critical,
                num_checks: args.num_checks,
                between_checks: args.between_checks,
                timeout: args.timeout,
            };
            match fetcher(settings.rating.max_redirects, settings.rating.timeout()) {
                Ok(http) => qualys::run(options, &settings.rating, http, clock).await,
                Err(e) => Verdict::from(e),
            }
        }
        Commands::HstsStatus(args) => {
            let options = hsts::HstsStatusOptions {
                domain: args.domain,
                api_url: args.api_url,
                warn: args.warn,
                critical: args.critical,
            };
            match fetcher(settings.hsts.max_redirects, settings.hsts.timeout()) {
                Ok(http) => hsts::run_status(options, &settings.hsts, http.as_ref()).await,
                Err(e) => Verdict::from(e),
            }
        }
        Commands::HstsPreloadable(args) => {
            let options = hsts::HstsPreloadableOptions {
                domain: args.domain,
                api_url: args.api_url,
            };
            match fetcher(settings.hsts.max_redirects, settings.hsts.timeout()) {
                Ok(http) => hsts::run_preloadable(options, &settings.hsts, http.as_ref()).await,
                Err(e) => Verdict::from(e),
            }
        }
    };

    CheckReport { name, verdict }
}
