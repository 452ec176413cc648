//! Providers Module - External Data Sources
//!
//! Threat-intel reputation clients and the GeoIP lookup.

pub mod abuseipdb;
pub mod geo;
pub mod otx;
pub mod virustotal;

pub use abuseipdb::*;
pub use geo::*;
pub use otx::*;
pub use virustotal::*;

use crate::models::{AppError, AppResult, ErrorCode};
use crate::utils::constants::USER_AGENT;

/// Shared HTTP client for every provider (one connection pool)
pub fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .build()
        .map_err(|e| AppError::with_source(ErrorCode::Unknown, "HTTP client init failed", e))
}
