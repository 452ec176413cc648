//! AbuseIPDB client - IP reputation
//!
//! API: GET {base}/api/v2/check?ipAddress=..&maxAgeInDays=90
//! Requires a key (header `Key`).

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{AppError, AppResult, ProviderConfig, ThreatSource};
use crate::utils::constants::{
    ABUSEIPDB_MAX_AGE_DAYS, DETAIL_API_ERROR, DETAIL_NOT_CONFIGURED, SOURCE_ABUSEIPDB,
};

#[derive(Debug, Deserialize)]
pub struct AbuseIpDbResponse {
    pub data: AbuseIpDbReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseIpDbReport {
    #[serde(default)]
    pub abuse_confidence_score: u32,
    #[serde(default)]
    pub total_reports: u64,
    pub usage_type: Option<String>,
    pub last_reported_at: Option<String>,
}

impl AbuseIpDbReport {
    pub fn into_source(self) -> ThreatSource {
        ThreatSource {
            name: SOURCE_ABUSEIPDB.to_string(),
            detected: self.abuse_confidence_score > 0,
            score: Some(self.abuse_confidence_score),
            details: Some(format!("Reported {} times", self.total_reports)),
            last_seen: self.last_reported_at,
            categories: self.usage_type.into_iter().collect(),
        }
    }
}

pub struct AbuseIpDbClient {
    client: reqwest::Client,
    config: ProviderConfig,
    timeout: Duration,
}

impl AbuseIpDbClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Raw report for an IP
    pub async fn fetch(&self, ip: &str) -> AppResult<AbuseIpDbReport> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::internal(DETAIL_NOT_CONFIGURED))?;
        let url = format!("{}/api/v2/check", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ipAddress", ip.to_string()),
                ("maxAgeInDays", ABUSEIPDB_MAX_AGE_DAYS.to_string()),
            ])
            .header("Key", key)
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::provider(SOURCE_ABUSEIPDB, response.status().as_u16()));
        }

        let body: AbuseIpDbResponse = response.json().await?;
        Ok(body.data)
    }

    /// Verdict for an IP; never fails
    pub async fn check(&self, ip: &str) -> ThreatSource {
        if !self.is_configured() {
            return ThreatSource::undetected(SOURCE_ABUSEIPDB, DETAIL_NOT_CONFIGURED);
        }

        match self.fetch(ip).await {
            Ok(report) => {
                debug!(
                    "AbuseIPDB {}: confidence {} ({} reports)",
                    ip, report.abuse_confidence_score, report.total_reports
                );
                report.into_source()
            }
            Err(e) => {
                warn!("⚠️ AbuseIPDB error for {}: {}", ip, e);
                ThreatSource::undetected(SOURCE_ABUSEIPDB, DETAIL_API_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_mapping() {
        let json = r#"{"data":{"ipAddress":"1.2.3.4","abuseConfidenceScore":87,
            "totalReports":412,"usageType":"Data Center/Web Hosting/Transit",
            "lastReportedAt":"2024-05-01T10:00:00+00:00"}}"#;
        let body: AbuseIpDbResponse = serde_json::from_str(json).unwrap();
        let source = body.data.into_source();

        assert!(source.detected);
        assert_eq!(source.score, Some(87));
        assert_eq!(source.details.as_deref(), Some("Reported 412 times"));
        assert_eq!(source.categories, vec!["Data Center/Web Hosting/Transit"]);
        assert!(source.last_seen.is_some());
    }

    #[test]
    fn test_clean_ip_not_detected() {
        let json = r#"{"data":{"abuseConfidenceScore":0,"totalReports":0,"usageType":null}}"#;
        let body: AbuseIpDbResponse = serde_json::from_str(json).unwrap();
        let source = body.data.into_source();

        assert!(!source.detected);
        assert_eq!(source.score, Some(0));
        assert!(source.categories.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let client = AbuseIpDbClient::new(
            reqwest::Client::new(),
            ProviderConfig::new("http://127.0.0.1:1", None),
            Duration::from_secs(1),
        );
        let source = client.check("1.2.3.4").await;
        assert!(!source.detected);
        assert_eq!(source.details.as_deref(), Some(DETAIL_NOT_CONFIGURED));
    }
}
