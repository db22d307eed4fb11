use clap::Parser;
use ssl_checks::cli::{Cli, Commands};
use ssl_checks::runner::check_name;

#[test]
fn test_host_defaults() {
    let cli = Cli::try_parse_from(["ssl-checks", "host", "-H", "example.com"]).unwrap();
    match cli.command {
        Commands::Host(args) => {
            assert_eq!(args.host, "example.com");
            assert_eq!(args.port, 443);
            assert_eq!(args.warning, 14);
            assert_eq!(args.critical, 7);
            assert!(args.starttls.is_none());
            assert!(!args.skip_hostname_verification);
        }
        other => panic!("unexpected command {:?}", other),
    }
    assert!(!cli.debug);
}

#[test]
fn test_cert_with_starttls() {
    let cli = Cli::try_parse_from([
        "ssl-checks",
        "cert",
        "-H",
        "mail.example.com",
        "-p",
        "25",
        "--starttls",
        "smtp",
        "-w",
        "30",
        "-c",
        "10",
    ])
    .unwrap();
    match cli.command {
        Commands::Cert(args) => {
            assert_eq!(args.port, Some(25));
            assert_eq!(args.starttls.as_deref(), Some("smtp"));
            assert!(args.pem.is_none());
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_cert_requires_thresholds() {
    assert!(Cli::try_parse_from(["ssl-checks", "cert", "-H", "example.com", "-p", "443"]).is_err());
}

#[test]
fn test_cert_pkcs12_flags() {
    let cli = Cli::try_parse_from([
        "ssl-checks", "cert", "-C", "bundle.p12", "-S", "secret", "-w", "30", "-c", "7",
    ])
    .unwrap();
    match cli.command {
        Commands::Cert(args) => {
            assert_eq!(args.pkcs12.as_deref(), Some(std::path::Path::new("bundle.p12")));
            assert_eq!(args.pass.as_deref(), Some("secret"));
            assert!(args.pem.is_none());
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_qualys_overrides() {
    let cli = Cli::try_parse_from([
        "ssl-checks",
        "qualys",
        "-d",
        "example.com",
        "--number-checks",
        "5",
        "-t",
        "30",
        "--timeout",
        "120",
    ])
    .unwrap();
    match cli.command {
        Commands::Qualys(args) => {
            assert_eq!(args.warn, "A-");
            assert_eq!(args.critical, "B");
            assert_eq!(args.num_checks, Some(5));
            assert_eq!(args.between_checks, Some(30));
            assert_eq!(args.timeout, Some(120));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_anchor_and_root_issuer_formats() {
    let cli = Cli::try_parse_from(["ssl-checks", "anchor", "-H", "example.com", "-a", "i:CN = Root"])
        .unwrap();
    match cli.command {
        Commands::Anchor(args) => assert_eq!(args.format, "ONELINE"),
        other => panic!("unexpected command {:?}", other),
    }

    let cli = Cli::try_parse_from([
        "ssl-checks",
        "root-issuer",
        "-u",
        "https://example.com",
        "-i",
        "CN=Root",
        "--debug",
    ])
    .unwrap();
    assert!(cli.debug);
    match cli.command {
        Commands::RootIssuer(args) => assert_eq!(args.format, "RFC2253"),
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_check_names() {
    let cli = Cli::try_parse_from(["ssl-checks", "crl", "-u", "crl.der", "-w", "60", "-c", "30"])
        .unwrap();
    assert_eq!(check_name(&cli.command), "CheckSSLCRL");

    let cli = Cli::try_parse_from(["ssl-checks", "hsts-status", "-d", "example.com"]).unwrap();
    assert_eq!(check_name(&cli.command), "CheckSSLHSTSStatus");

    let cli = Cli::try_parse_from(["ssl-checks", "hsts-preloadable", "-d", "example.com"]).unwrap();
    assert_eq!(check_name(&cli.command), "CheckSSLHSTSPreloadable");
}
