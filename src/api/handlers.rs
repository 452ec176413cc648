//! API Request Handlers

use axum::extract::{rejection::JsonRejection, Json, Path, Query, State};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::middleware::{RateLimitConfig, RateLimiter};
use super::types::*;
use crate::core::{LookupService, ThreatAggregator};
use crate::models::{AppConfig, AppError, AppResult, Indicator, IocRecord, IocType};
use crate::utils::cache::IocStore;
use crate::utils::constants::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};
use crate::utils::telemetry::{LookupStats, StatsCollector};

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub lookup: LookupService,
    pub store: Arc<IocStore>,
    pub stats: Arc<StatsCollector>,
    pub rate_limiter: Arc<RateLimiter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let store = Arc::new(IocStore::new());
        let stats = Arc::new(StatsCollector::new(config.active_sources()));
        let aggregator = ThreatAggregator::from_config(&config)?;
        let lookup = LookupService::new(aggregator, store.clone(), stats.clone(), config.cache_ttl);
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            requests_per_window: config.rate_limit_requests,
            window_duration: config.rate_limit_window,
        }));

        Ok(Self {
            config,
            lookup,
            store,
            stats,
            rate_limiter,
            start_time: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Restore records and counters from the configured snapshot, if any
    pub fn restore_snapshot(&self) -> AppResult<()> {
        if let Some(path) = &self.config.snapshot_path {
            let counters = self.store.load_snapshot(path)?;
            self.stats.restore(&counters);
        }
        Ok(())
    }

    /// Persist records and counters to the configured snapshot, if any
    pub fn persist_snapshot(&self) -> AppResult<Option<usize>> {
        match &self.config.snapshot_path {
            Some(path) => {
                let saved = self.store.save_snapshot(path, self.stats.snapshot())?;
                Ok(Some(saved))
            }
            None => Ok(None),
        }
    }
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthData> {
    Json(HealthData {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        store: "memory".to_string(),
        records: state.store.len(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================
// IOC Lookup
// ============================================

pub async fn lookup_ioc(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LookupRequest>, JsonRejection>,
) -> AppResult<Json<LookupResponse>> {
    let Json(req) = payload.map_err(|e| {
        warn!("Rejected lookup body: {}", e);
        AppError::bad_request("Value and type are required")
    })?;

    let (value, kind) = match (non_empty(req.value), non_empty(req.ioc_type)) {
        (Some(value), Some(kind)) => (value, kind),
        _ => return Err(AppError::bad_request("Value and type are required")),
    };

    let kind: IocType = kind.parse()?;
    let ioc = Indicator::parse(&value, kind)?;

    let (record, cached) = state.lookup.lookup(&ioc).await;
    info!(
        "{} {} -> {} ({}){}",
        record.threat_level.emoji(),
        ioc,
        record.threat_score,
        record.threat_level.as_str(),
        if cached { " [cached]" } else { "" }
    );

    Ok(Json(LookupResponse { record, cached }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================
// Recent Lookups
// ============================================

pub async fn recent_lookups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<IocRecord>> {
    let limit = parse_limit(query.limit.as_deref());
    Json(state.store.recent(limit))
}

/// Missing, unparsable or zero -> default; capped at the maximum
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|l| l.trim().parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT)
}

// ============================================
// IOC by id
// ============================================

pub async fn get_ioc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<IocRecord>> {
    state
        .store
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("IOC not found"))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<LookupStats> {
    let cache_stats = state.store.stats();
    info!(
        "📊 Cache Stats: {} entries, {:.1}% hit rate ({} hits / {} misses)",
        cache_stats.entries, cache_stats.hit_rate, cache_stats.hits, cache_stats.misses
    );

    Json(state.stats.get_stats())
}

pub async fn reset_stats(State(state): State<Arc<AppState>>) -> Json<LookupStats> {
    state.stats.reset();
    info!("🗑️ Stats reset");
    Json(state.stats.get_stats())
}
