//! ip-api.com GeoIP client
//!
//! API: GET {base}/json/{ip}
//! Free, no API key required

use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::models::{AppError, AppResult, GeoLocation, ProviderConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpApiResponse {
    pub status: String,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub region_name: Option<String>,
    #[serde(rename = "as")]
    pub as_info: Option<String>,
    pub isp: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl IpApiResponse {
    /// Only successful lookups carry a location
    pub fn into_location(self) -> Option<GeoLocation> {
        if self.status != "success" {
            return None;
        }

        Some(GeoLocation {
            country: self.country.unwrap_or_default(),
            country_code: self.country_code.unwrap_or_default(),
            city: self.city,
            region: self.region_name,
            // "AS15169 Google LLC" -> "AS15169"
            asn: self
                .as_info
                .as_deref()
                .and_then(|s| s.split_whitespace().next())
                .map(String::from),
            org: self.isp,
            lat: self.lat,
            lon: self.lon,
        })
    }
}

pub struct GeoIpClient {
    client: reqwest::Client,
    config: ProviderConfig,
    timeout: Duration,
}

impl GeoIpClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    pub async fn fetch(&self, ip: &str) -> AppResult<IpApiResponse> {
        let url = format!("{}/json/{}", self.config.base_url, ip);
        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(AppError::provider("ip-api", response.status().as_u16()));
        }

        Ok(response.json().await?)
    }

    /// Location for an IP, `None` on any failure
    pub async fn locate(&self, ip: &str) -> Option<GeoLocation> {
        match self.fetch(ip).await {
            Ok(body) => body.into_location(),
            Err(e) => {
                warn!("⚠️ GeoIP error for {}: {}", ip, e);
                None
            }
        }
    }
}
