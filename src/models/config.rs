//! Configuration module for Threat Sentry
//!
//! Everything is read from the environment (a `.env` file is honored).
//! API keys are NEVER logged, only whether they are present.

use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_ABUSEIPDB_BASE_URL, DEFAULT_CACHE_TTL_SECS, DEFAULT_GEOIP_BASE_URL, DEFAULT_HOST,
    DEFAULT_MAX_RECORDS, DEFAULT_OTX_BASE_URL, DEFAULT_PORT, DEFAULT_PROVIDER_TIMEOUT_SECS,
    DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_VIRUSTOTAL_BASE_URL,
};

/// Endpoint + credentials for one upstream service
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Runtime configuration for the API server and the aggregator
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    pub abuseipdb: ProviderConfig,
    pub virustotal: ProviderConfig,
    pub otx: ProviderConfig,
    /// ip-api.com compatible endpoint, no key
    pub geoip: ProviderConfig,
    /// Per-request timeout for every upstream call
    pub provider_timeout: Duration,
    /// How long a stored record is served without re-querying
    pub cache_ttl: Duration,
    /// Upper bound on stored records
    pub max_records: usize,
    /// Extra CORS origin (the deployed frontend)
    pub frontend_url: Option<String>,
    /// Requests per client per window
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    /// Where records and stats are persisted across restarts
    pub snapshot_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            abuseipdb: ProviderConfig::new(DEFAULT_ABUSEIPDB_BASE_URL, None),
            virustotal: ProviderConfig::new(DEFAULT_VIRUSTOTAL_BASE_URL, None),
            otx: ProviderConfig::new(DEFAULT_OTX_BASE_URL, None),
            geoip: ProviderConfig::new(DEFAULT_GEOIP_BASE_URL, None),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_records: DEFAULT_MAX_RECORDS,
            frontend_url: None,
            rate_limit_requests: DEFAULT_RATE_LIMIT_REQUESTS,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            snapshot_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let config = Self {
            host: env_string("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            abuseipdb: ProviderConfig::new(
                env_string("ABUSEIPDB_BASE_URL").unwrap_or(defaults.abuseipdb.base_url),
                env_key("ABUSEIPDB_API_KEY"),
            ),
            virustotal: ProviderConfig::new(
                env_string("VIRUSTOTAL_BASE_URL").unwrap_or(defaults.virustotal.base_url),
                env_key("VIRUSTOTAL_API_KEY"),
            ),
            otx: ProviderConfig::new(
                env_string("OTX_BASE_URL").unwrap_or(defaults.otx.base_url),
                env_key("ALIENVAULT_API_KEY"),
            ),
            geoip: ProviderConfig::new(
                env_string("GEOIP_BASE_URL").unwrap_or(defaults.geoip.base_url),
                None,
            ),
            provider_timeout: env_parse("PROVIDER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            cache_ttl: env_parse("CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            max_records: env_parse("MAX_RECORDS")?.unwrap_or(defaults.max_records),
            frontend_url: env_string("FRONTEND_URL"),
            rate_limit_requests: env_parse("RATE_LIMIT_REQUESTS")?
                .unwrap_or(defaults.rate_limit_requests),
            rate_limit_window: env_parse("RATE_LIMIT_WINDOW_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            snapshot_path: env_string("SNAPSHOT_PATH").map(PathBuf::from),
        };

        config.log_summary();
        Ok(config)
    }

    /// Number of sources able to answer with this configuration.
    /// OTX works anonymously; AbuseIPDB and VirusTotal need a key.
    pub fn active_sources(&self) -> u64 {
        1 + self.abuseipdb.is_configured() as u64 + self.virustotal.is_configured() as u64
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn log_summary(&self) {
        info!(
            "🔑 AbuseIPDB key: {}, VirusTotal key: {}, OTX key: {}",
            presence(&self.abuseipdb.api_key),
            presence(&self.virustotal.api_key),
            presence(&self.otx.api_key),
        );
        info!(
            "⚙️ cache TTL {}s, provider timeout {}s, max records {}",
            self.cache_ttl.as_secs(),
            self.provider_timeout.as_secs(),
            self.max_records
        );
    }
}

fn presence(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "configured"
    } else {
        "missing"
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// API keys: empty and placeholder values count as unset
fn env_key(name: &str) -> Option<String> {
    env_string(name).filter(|k| k != "YOUR_API_KEY")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> AppResult<Option<T>> {
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::invalid_config(name, &raw)),
        None => Ok(None),
    }
}
