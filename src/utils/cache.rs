//! IOC Store - latest aggregation per (type, value)
//!
//! Thread-safe record store on DashMap, doubling as the lookup cache:
//! a record younger than the freshness window is served instead of
//! re-querying the upstream sources.
//!
//! Features:
//! - Freshness check on `lastSeen` (1 hour default)
//! - Stable record identity across re-analysis (id, firstSeen)
//! - Capacity-bounded pruning of the least recently seen records
//! - JSON snapshot for persistence across restarts

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{AnalysisReport, AppResult, Indicator, IocRecord};
use crate::utils::telemetry::StatsSnapshot;

/// On-disk form of the store plus the usage counters
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub records: Vec<IocRecord>,
    #[serde(default)]
    pub stats: StatsSnapshot,
}

#[derive(Clone, Default)]
pub struct IocStore {
    /// "type:value" -> record
    records: Arc<DashMap<String, IocRecord>>,
    /// record id -> "type:value"
    ids: Arc<DashMap<String, String>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl IocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh record for the indicator, with `lastSeen` bumped to now.
    /// Returns None when absent or older than `max_age`.
    pub fn find_fresh(&self, ioc: &Indicator, max_age: Duration) -> Option<IocRecord> {
        let key = ioc.key();
        let max_age = ChronoDuration::from_std(max_age).unwrap_or_else(|_| ChronoDuration::max_value());
        let now = Utc::now();

        match self.records.get_mut(&key) {
            Some(mut entry) if now.signed_duration_since(entry.last_seen) <= max_age => {
                entry.last_seen = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                info!("✅ CACHE HIT: {}", key);
                Some(entry.value().clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS (stale): {}", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS: {}", key);
                None
            }
        }
    }

    /// Insert or replace the record for the report's (type, value)
    pub fn upsert(&self, report: AnalysisReport) -> IocRecord {
        let key = format!("{}:{}", report.ioc_type, report.value);

        let record = match self.records.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let record = IocRecord::from_report(report, Some(entry.get()));
                entry.insert(record.clone());
                record
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let record = IocRecord::from_report(report, None);
                entry.insert(record.clone());
                record
            }
        };

        self.ids.insert(record.id.clone(), key.clone());
        debug!("💾 STORE SET: {} ({})", key, record.id);
        record
    }

    /// Record by id
    pub fn get(&self, id: &str) -> Option<IocRecord> {
        let key = self.ids.get(id)?.value().clone();
        self.records.get(&key).map(|r| r.value().clone())
    }

    /// Most recently seen records first
    pub fn recent(&self, limit: usize) -> Vec<IocRecord> {
        let mut records: Vec<IocRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        records.truncate(limit);
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop the least recently seen records above `max_records`
    pub fn prune(&self, max_records: usize) -> usize {
        let excess = self.records.len().saturating_sub(max_records);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(DateTime<Utc>, String, String)> = self
            .records
            .iter()
            .map(|r| (r.last_seen, r.key().clone(), r.id.clone()))
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(&b.0));

        let evicted = by_age
            .into_iter()
            .take(excess)
            .filter(|(seen, key, id)| self.evict_if_unchanged(key, id, *seen))
            .count();

        info!("🧹 STORE PRUNE: {} records evicted", evicted);
        evicted
    }

    /// Remove `key` only if it was not touched since `seen`
    fn evict_if_unchanged(&self, key: &str, id: &str, seen: DateTime<Utc>) -> bool {
        let removed = self
            .records
            .remove_if(key, |_, record| record.last_seen == seen)
            .is_some();
        if removed {
            self.ids.remove(id);
        }
        removed
    }

    /// Cache hit/miss counters
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.records.len(),
            hits,
            misses,
            hit_rate,
        }
    }

    /// Write all records and the given counters to `path`
    pub fn save_snapshot(&self, path: &Path, stats: StatsSnapshot) -> AppResult<usize> {
        let snapshot = StoreSnapshot {
            records: self.recent(usize::MAX),
            stats,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        Ok(snapshot.records.len())
    }

    /// Load records from `path`, returning the stored counters.
    /// A missing file is an empty snapshot.
    pub fn load_snapshot(&self, path: &Path) -> AppResult<StatsSnapshot> {
        if !path.exists() {
            return Ok(StatsSnapshot::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&raw)?;
        for record in snapshot.records {
            let key = record.key();
            self.ids.insert(record.id.clone(), key.clone());
            self.records.insert(key, record);
        }

        info!("📂 Loaded {} records from {}", self.records.len(), path.display());
        Ok(snapshot.stats)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, IocType, ThreatLevel};

    fn report(value: &str, analyzed_at: DateTime<Utc>) -> AnalysisReport {
        AnalysisReport {
            value: value.to_string(),
            ioc_type: IocType::Domain,
            threat_score: 10,
            threat_level: ThreatLevel::Info,
            confidence: Confidence::Low,
            sources: vec![],
            geo: None,
            tags: vec![],
            pulse_count: 0,
            malware_families: vec![],
            analyzed_at,
        }
    }

    fn domain(value: &str) -> Indicator {
        Indicator::parse(value, IocType::Domain).unwrap()
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_fresh_hit_bumps_last_seen() {
        let store = IocStore::new();
        let analyzed = Utc::now() - ChronoDuration::minutes(10);
        store.upsert(report("evil.example.com", analyzed));

        let hit = store.find_fresh(&domain("evil.example.com"), HOUR).unwrap();
        assert!(hit.last_seen > analyzed);
        assert_eq!(hit.first_seen, analyzed);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_stale_record_misses_but_is_kept() {
        let store = IocStore::new();
        store.upsert(report("old.example.com", Utc::now() - ChronoDuration::hours(2)));

        assert!(store.find_fresh(&domain("old.example.com"), HOUR).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_miss_on_other_type() {
        let store = IocStore::new();
        store.upsert(report("evil.example.com", Utc::now()));
        let as_url = Indicator::parse("http://evil.example.com", IocType::Url).unwrap();
        assert!(store.find_fresh(&as_url, HOUR).is_none());
    }

    #[test]
    fn test_upsert_keeps_identity() {
        let store = IocStore::new();
        let first = store.upsert(report("evil.example.com", Utc::now() - ChronoDuration::hours(3)));
        let mut again = report("evil.example.com", Utc::now());
        again.threat_score = 90;
        let second = store.upsert(again);

        assert_eq!(store.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.first_seen, second.first_seen);
        assert_eq!(store.get(&first.id).unwrap().threat_score, 90);
    }

    #[test]
    fn test_recent_sorted_and_limited() {
        let store = IocStore::new();
        let now = Utc::now();
        store.upsert(report("a.example.com", now - ChronoDuration::minutes(30)));
        store.upsert(report("b.example.com", now));
        store.upsert(report("c.example.com", now - ChronoDuration::minutes(5)));

        let recent = store.recent(2);
        let values: Vec<&str> = recent.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["b.example.com", "c.example.com"]);
    }

    #[test]
    fn test_get_unknown_id() {
        let store = IocStore::new();
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn test_prune_evicts_oldest() {
        let store = IocStore::new();
        let now = Utc::now();
        let oldest = store.upsert(report("a.example.com", now - ChronoDuration::hours(5)));
        store.upsert(report("b.example.com", now - ChronoDuration::hours(1)));
        store.upsert(report("c.example.com", now));

        assert_eq!(store.prune(2), 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(&oldest.id).is_none());
        assert_eq!(store.prune(2), 0);
    }

    #[test]
    fn test_prune_skips_record_touched_after_scan() {
        let store = IocStore::new();
        let scanned_at = Utc::now() - ChronoDuration::hours(5);
        let record = store.upsert(report("a.example.com", scanned_at));
        let key = domain("a.example.com").key();

        // Served again between the age scan and the eviction
        store.find_fresh(&domain("a.example.com"), Duration::from_secs(6 * 3600));

        assert!(!store.evict_if_unchanged(&key, &record.id, scanned_at));
        assert_eq!(store.get(&record.id).map(|r| r.value), Some("a.example.com".to_string()));

        let seen = store.get(&record.id).unwrap().last_seen;
        assert!(store.evict_if_unchanged(&key, &record.id, seen));
        assert!(store.is_empty());
        assert!(store.get(&record.id).is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = IocStore::new();
        let record = store.upsert(report("evil.example.com", Utc::now()));
        let path = std::env::temp_dir().join(format!("threat_sentry_{}.json", uuid::Uuid::new_v4()));

        let stats = StatsSnapshot {
            total_lookups: 7,
            threats_detected: 3,
            critical_threats: 1,
        };
        assert_eq!(store.save_snapshot(&path, stats.clone()).unwrap(), 1);

        let restored = IocStore::new();
        let loaded_stats = restored.load_snapshot(&path).unwrap();
        assert_eq!(loaded_stats, stats);
        assert_eq!(restored.get(&record.id), Some(record));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let store = IocStore::new();
        let path = std::env::temp_dir().join("threat_sentry_does_not_exist.json");
        let stats = store.load_snapshot(&path).unwrap();
        assert_eq!(stats, StatsSnapshot::default());
        assert!(store.is_empty());
    }
}
