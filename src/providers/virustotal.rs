//! VirusTotal v3 client - IP, domain and file reputation
//!
//! API: GET {base}/api/v3/{ip_addresses|domains|files}/{ioc}
//! Requires a key (header `x-apikey`). URLs are not queried.

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{AppError, AppResult, Indicator, IocType, ProviderConfig, ThreatSource};
use crate::utils::constants::{
    DETAIL_NOT_CONFIGURED, DETAIL_NOT_FOUND, DETAIL_UNSUPPORTED_TYPE, SOURCE_VIRUSTOTAL,
};

#[derive(Debug, Deserialize)]
pub struct VirusTotalResponse {
    pub data: VirusTotalObject,
}

#[derive(Debug, Deserialize)]
pub struct VirusTotalObject {
    pub attributes: VirusTotalAttributes,
}

#[derive(Debug, Deserialize)]
pub struct VirusTotalAttributes {
    /// Engine verdict counters: malicious, suspicious, undetected, harmless, timeout...
    #[serde(default)]
    pub last_analysis_stats: BTreeMap<String, u32>,
    /// Unix seconds
    pub last_analysis_date: Option<i64>,
}

impl VirusTotalAttributes {
    pub fn into_source(self) -> ThreatSource {
        let malicious = self.last_analysis_stats.get("malicious").copied().unwrap_or(0);
        let total: u32 = self.last_analysis_stats.values().sum();

        ThreatSource {
            name: SOURCE_VIRUSTOTAL.to_string(),
            detected: malicious > 0,
            score: Some(malicious),
            details: Some(format!("{}/{} engines detected", malicious, total)),
            last_seen: self
                .last_analysis_date
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .map(|dt| dt.to_rfc3339()),
            categories: Vec::new(),
        }
    }
}

pub struct VirusTotalClient {
    client: reqwest::Client,
    config: ProviderConfig,
    timeout: Duration,
}

impl VirusTotalClient {
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

    /// v3 collection for an IOC type
    fn collection(kind: IocType) -> Option<&'static str> {
        match kind {
            IocType::Ip => Some("ip_addresses"),
            IocType::Domain => Some("domains"),
            IocType::Hash => Some("files"),
            IocType::Url => None,
        }
    }

    /// Raw attributes for an indicator
    pub async fn fetch(&self, ioc: &Indicator) -> AppResult<VirusTotalAttributes> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::internal(DETAIL_NOT_CONFIGURED))?;
        let collection = Self::collection(ioc.kind)
            .ok_or_else(|| AppError::unsupported_type(ioc.kind.as_str()))?;
        let url = format!("{}/api/v3/{}/{}", self.config.base_url, collection, ioc.value);

        let response = self
            .client
            .get(&url)
            .header("x-apikey", key)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::provider(SOURCE_VIRUSTOTAL, response.status().as_u16()));
        }

        let body: VirusTotalResponse = response.json().await?;
        Ok(body.data.attributes)
    }

    /// Verdict for an indicator; never fails
    pub async fn check(&self, ioc: &Indicator) -> ThreatSource {
        if !self.is_configured() {
            return ThreatSource::undetected(SOURCE_VIRUSTOTAL, DETAIL_NOT_CONFIGURED);
        }
        if Self::collection(ioc.kind).is_none() {
            return ThreatSource::undetected(SOURCE_VIRUSTOTAL, DETAIL_UNSUPPORTED_TYPE);
        }

        match self.fetch(ioc).await {
            Ok(attributes) => {
                let source = attributes.into_source();
                debug!("VirusTotal {}: {:?}", ioc, source.details);
                source
            }
            Err(e) => {
                warn!("⚠️ VirusTotal error for {}: {}", ioc, e);
                ThreatSource::undetected(SOURCE_VIRUSTOTAL, DETAIL_NOT_FOUND)
            }
        }
    }
}
