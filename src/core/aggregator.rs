//! Threat Aggregator - parallel fan-out over every applicable source
//!
//! AbuseIPDB and GeoIP are only queried for IPs. All calls are issued at
//! once and awaited together; a failing source degrades to an undetected
//! verdict, so `analyze` itself cannot fail.

use chrono::Utc;
use std::time::Instant;
use tracing::info;

use super::threat_score::ThreatScoreBuilder;
use crate::models::{AnalysisReport, AppConfig, AppResult, Indicator, IocType};
use crate::providers::{
    build_http_client, AbuseIpDbClient, GeoIpClient, OtxClient, VirusTotalClient,
};

pub struct ThreatAggregator {
    abuseipdb: AbuseIpDbClient,
    virustotal: VirusTotalClient,
    otx: OtxClient,
    geoip: GeoIpClient,
}

impl ThreatAggregator {
    pub fn new(
        abuseipdb: AbuseIpDbClient,
        virustotal: VirusTotalClient,
        otx: OtxClient,
        geoip: GeoIpClient,
    ) -> Self {
        Self {
            abuseipdb,
            virustotal,
            otx,
            geoip,
        }
    }

    /// Wire every client to the configured endpoints over one HTTP pool
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = build_http_client()?;
        let timeout = config.provider_timeout;

        Ok(Self::new(
            AbuseIpDbClient::new(client.clone(), config.abuseipdb.clone(), timeout),
            VirusTotalClient::new(client.clone(), config.virustotal.clone(), timeout),
            OtxClient::new(client.clone(), config.otx.clone(), timeout),
            GeoIpClient::new(client, config.geoip.clone(), timeout),
        ))
    }

    /// Query all sources for one indicator and score the result
    pub async fn analyze(&self, ioc: &Indicator) -> AnalysisReport {
        let start = Instant::now();
        let is_ip = ioc.kind == IocType::Ip;

        let abuseipdb = async {
            if is_ip {
                Some(self.abuseipdb.check(&ioc.value).await)
            } else {
                None
            }
        };
        let geo = async {
            if is_ip {
                self.geoip.locate(&ioc.value).await
            } else {
                None
            }
        };

        let (abuseipdb, virustotal, otx, geo) = tokio::join!(
            abuseipdb,
            self.virustotal.check(ioc),
            self.otx.check(ioc),
            geo
        );

        let (score, sources) = ThreatScoreBuilder::new()
            .with_optional_source(abuseipdb)
            .with_source(virustotal)
            .with_source(otx.source)
            .build();

        info!(
            "🔍 Analyzed {} in {}ms: {}",
            ioc,
            start.elapsed().as_millis(),
            score.summary()
        );

        AnalysisReport {
            value: ioc.value.clone(),
            ioc_type: ioc.kind,
            threat_score: score.total,
            threat_level: score.level,
            confidence: score.confidence,
            sources,
            geo,
            tags: score.tags,
            pulse_count: otx.pulse_count,
            malware_families: otx.malware_families,
            analyzed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, ThreatLevel};
    use crate::utils::constants::{DETAIL_NOT_CONFIGURED, DETAIL_UNSUPPORTED_TYPE};

    /// Nothing listens on port 1, so every upstream call fails fast
    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        for provider in [
            &mut config.abuseipdb,
            &mut config.virustotal,
            &mut config.otx,
            &mut config.geoip,
        ] {
            provider.base_url = "http://127.0.0.1:1".to_string();
        }
        config.provider_timeout = std::time::Duration::from_secs(2);
        config
    }

    #[tokio::test]
    async fn test_ip_queries_three_sources() {
        let aggregator = ThreatAggregator::from_config(&offline_config()).unwrap();
        let ioc = Indicator::parse("1.2.3.4", IocType::Ip).unwrap();
        let report = aggregator.analyze(&ioc).await;

        let names: Vec<&str> = report.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["AbuseIPDB", "VirusTotal", "AlienVault OTX"]);
        assert_eq!(report.sources[0].details.as_deref(), Some(DETAIL_NOT_CONFIGURED));
        assert_eq!(report.threat_score, 0);
        assert_eq!(report.threat_level, ThreatLevel::Info);
        assert_eq!(report.confidence, Confidence::Low);
        assert!(report.geo.is_none());
    }

    #[tokio::test]
    async fn test_url_degrades_everywhere() {
        let aggregator = ThreatAggregator::from_config(&offline_config()).unwrap();
        let ioc = Indicator::parse("https://evil.example.com/a", IocType::Url).unwrap();
        let report = aggregator.analyze(&ioc).await;

        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.sources[1].details.as_deref(), Some(DETAIL_UNSUPPORTED_TYPE));
        assert_eq!(report.pulse_count, 0);
    }
}
