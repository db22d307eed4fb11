//! ssl-checks - monitoring checks for TLS certificates
//!
//! Runs one check per invocation, prints `<CheckName> <STATUS>: <message>`
//! and exits with the monitoring status code.

use anyhow::Context;
use clap::Parser;
use ssl_checks::cli::Cli;
use ssl_checks::config;
use ssl_checks::models::{Status, Verdict};
use ssl_checks::runner::{check_name, run_command, CheckReport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let report = match run(cli).await {
        Ok(report) => report,
        Err((name, e)) => CheckReport {
            name,
            verdict: Verdict::unknown(format!("{:#}", e)),
        },
    };

    println!("{}", report);
    std::process::exit(report.status().exit_code());
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("warn,ssl_checks=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<CheckReport, (&'static str, anyhow::Error)> {
    let name = check_name(&cli.command);
    let settings = config::load_settings(cli.config.as_deref())
        .context("Failed to load settings")
        .map_err(|e| (name, e))?;

    let report = run_command(cli.command, &settings).await;
    if report.status() != Status::Ok {
        tracing::debug!(check = report.name, status = %report.status(), "check did not pass");
    }
    Ok(report)
}
