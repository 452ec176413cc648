//! AlienVault OTX client - pulse lookups
//!
//! API: GET {base}/api/v1/indicators/{section}/{ioc}/general
//! Works anonymously; `X-OTX-API-KEY` is sent when configured.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{AppError, AppResult, Indicator, IocType, ProviderConfig, ThreatSource};
use crate::utils::constants::{
    DETAIL_NOT_FOUND, DETAIL_UNSUPPORTED_TYPE, OTX_MAX_PULSE_CATEGORIES, SOURCE_OTX,
};

#[derive(Debug, Default, Deserialize)]
pub struct OtxGeneralResponse {
    #[serde(default)]
    pub pulse_info: OtxPulseInfo,
}

#[derive(Debug, Default, Deserialize)]
pub struct OtxPulseInfo {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub pulses: Vec<OtxPulse>,
}

#[derive(Debug, Deserialize)]
pub struct OtxPulse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub malware_families: Vec<OtxMalwareFamily>,
}

/// Pulses list families either as objects or as bare names
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OtxMalwareFamily {
    Object { display_name: Option<String> },
    Name(String),
}

impl OtxMalwareFamily {
    pub fn display_name(&self) -> Option<&String> {
        match self {
            OtxMalwareFamily::Object { display_name } => display_name.as_ref(),
            OtxMalwareFamily::Name(name) => Some(name),
        }
    }
}

/// OTX verdict plus the structured pulse data the aggregator keeps
#[derive(Debug, Clone)]
pub struct OtxVerdict {
    pub source: ThreatSource,
    pub pulse_count: u64,
    pub malware_families: Vec<String>,
}

impl OtxVerdict {
    fn degraded(details: &str) -> Self {
        Self {
            source: ThreatSource::undetected(SOURCE_OTX, details),
            pulse_count: 0,
            malware_families: Vec::new(),
        }
    }
}

impl OtxGeneralResponse {
    pub fn into_verdict(self) -> OtxVerdict {
        let info = self.pulse_info;

        let categories = info
            .pulses
            .iter()
            .take(OTX_MAX_PULSE_CATEGORIES)
            .map(|p| p.name.clone())
            .collect();

        let mut malware_families: Vec<String> = Vec::new();
        for name in info
            .pulses
            .iter()
            .flat_map(|p| p.malware_families.iter())
            .filter_map(|f| f.display_name())
        {
            if !malware_families.contains(name) {
                malware_families.push(name.clone());
            }
        }

        OtxVerdict {
            source: ThreatSource {
                name: SOURCE_OTX.to_string(),
                detected: info.count > 0,
                score: None,
                details: Some(format!("Found in {} pulses", info.count)),
                last_seen: None,
                categories,
            },
            pulse_count: info.count,
            malware_families,
        }
    }
}

pub struct OtxClient {
    client: reqwest::Client,
    config: ProviderConfig,
    timeout: Duration,
}

impl OtxClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    /// Indicator section in the OTX API
    fn section(ioc: &Indicator) -> Option<&'static str> {
        match ioc.kind {
            IocType::Ip if ioc.is_ipv6() => Some("IPv6"),
            IocType::Ip => Some("IPv4"),
            IocType::Domain => Some("domain"),
            IocType::Hash => Some("file"),
            IocType::Url => None,
        }
    }

    pub async fn fetch(&self, ioc: &Indicator) -> AppResult<OtxGeneralResponse> {
        let section =
            Self::section(ioc).ok_or_else(|| AppError::unsupported_type(ioc.kind.as_str()))?;
        let url = format!(
            "{}/api/v1/indicators/{}/{}/general",
            self.config.base_url, section, ioc.value
        );

        let mut request = self.client.get(&url).timeout(self.timeout);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.header("X-OTX-API-KEY", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AppError::provider(SOURCE_OTX, response.status().as_u16()));
        }

        Ok(response.json().await?)
    }

    /// Verdict for an indicator; never fails
    pub async fn check(&self, ioc: &Indicator) -> OtxVerdict {
        if Self::section(ioc).is_none() {
            return OtxVerdict::degraded(DETAIL_UNSUPPORTED_TYPE);
        }

        match self.fetch(ioc).await {
            Ok(general) => {
                let verdict = general.into_verdict();
                debug!("OTX {}: {} pulses", ioc, verdict.pulse_count);
                verdict
            }
            Err(e) => {
                warn!("⚠️ AlienVault OTX error for {}: {}", ioc, e);
                OtxVerdict::degraded(DETAIL_NOT_FOUND)
            }
        }
    }
}
