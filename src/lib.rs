//! ThreatSentry Library
//!
//! Indicator-of-compromise reputation aggregator:
//! - Fans each lookup out to AbuseIPDB, VirusTotal and AlienVault OTX
//! - Normalizes their verdicts into one 0-100 threat score
//! - Serves results from a freshness-bounded record store
//! - Exposes lookups, history and counters over a REST API

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{LookupService, ThreatAggregator, ThreatScore, ThreatScoreBuilder};
pub use models::{
    AnalysisReport, AppConfig, AppError, AppResult, Confidence, ErrorCode, GeoLocation, Indicator,
    IocRecord, IocType, ThreatLevel, ThreatSource,
};
pub use utils::cache::{CacheStats, IocStore};
pub use utils::telemetry::{LookupStats, StatsCollector};
