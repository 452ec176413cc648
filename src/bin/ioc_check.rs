//! One-shot IOC check from the command line
//!
//! Usage:
//!   cargo run --bin ioc_check -- <ip|domain|hash|url> <value> [value...]
//!
//! Prints one JSON report per value. Uses the same environment as the server.

use clap::Parser;
use futures_util::future::join_all;
use threat_sentry::{AppConfig, Indicator, IocType, ThreatAggregator};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Score indicators against AbuseIPDB, VirusTotal and AlienVault OTX
#[derive(Parser, Debug)]
#[command(name = "ioc_check")]
#[command(version, about, long_about = None)]
struct Args {
    /// Indicator type: ip, domain, hash or url
    kind: IocType,

    /// One or more values of that type
    #[arg(required = true)]
    values: Vec<String>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();

    FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let indicators = args
        .values
        .iter()
        .map(|value| Indicator::parse(value, args.kind))
        .collect::<Result<Vec<_>, _>>()?;

    let config = AppConfig::from_env()?;
    let aggregator = ThreatAggregator::from_config(&config)?;

    let reports = join_all(indicators.iter().map(|ioc| aggregator.analyze(ioc))).await;

    for report in &reports {
        eprintln!(
            "{} {} -> {} ({})",
            report.threat_level.emoji(),
            report.value,
            report.threat_score,
            report.threat_level.as_str()
        );
        println!("{}", serde_json::to_string_pretty(report)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_kind_and_values() {
        let args = Args::try_parse_from(["ioc_check", "DOMAIN", "example.com", "evil.test"]).unwrap();
        assert_eq!(args.kind, IocType::Domain);
        assert_eq!(args.values, vec!["example.com", "evil.test"]);
    }

    #[test]
    fn test_args_require_a_value() {
        assert!(Args::try_parse_from(["ioc_check", "ip"]).is_err());
        assert!(Args::try_parse_from(["ioc_check"]).is_err());
    }

    #[test]
    fn test_args_reject_unknown_kind() {
        assert!(Args::try_parse_from(["ioc_check", "email", "a@b.test"]).is_err());
    }
}
