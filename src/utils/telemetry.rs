//! Telemetry Module - lookup usage statistics
//!
//! Counts fresh (non-cached) lookups and how many of them turned out to be
//! threats. Cached answers are not counted.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::ThreatLevel;

/// Counters as exposed by `GET /api/stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupStats {
    pub total_lookups: u64,
    pub threats_detected: u64,
    pub critical_threats: u64,
    pub active_sources: u64,
}

/// Persisted part of the counters (active sources follow the config)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_lookups: u64,
    pub threats_detected: u64,
    pub critical_threats: u64,
}

/// Lock-free lookup counters
pub struct StatsCollector {
    total_lookups: AtomicU64,
    threats_detected: AtomicU64,
    critical_threats: AtomicU64,
    active_sources: u64,
}

impl StatsCollector {
    pub fn new(active_sources: u64) -> Self {
        Self {
            total_lookups: AtomicU64::new(0),
            threats_detected: AtomicU64::new(0),
            critical_threats: AtomicU64::new(0),
            active_sources,
        }
    }

    /// Count one fresh lookup that ended at `level`
    pub fn record_lookup(&self, level: ThreatLevel) {
        self.total_lookups.fetch_add(1, Ordering::Relaxed);
        if level.is_threat() {
            self.threats_detected.fetch_add(1, Ordering::Relaxed);
        }
        if level == ThreatLevel::Critical {
            self.critical_threats.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_stats(&self) -> LookupStats {
        LookupStats {
            total_lookups: self.total_lookups.load(Ordering::Relaxed),
            threats_detected: self.threats_detected.load(Ordering::Relaxed),
            critical_threats: self.critical_threats.load(Ordering::Relaxed),
            active_sources: self.active_sources,
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.total_lookups.store(0, Ordering::Relaxed);
        self.threats_detected.store(0, Ordering::Relaxed);
        self.critical_threats.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let stats = self.get_stats();
        StatsSnapshot {
            total_lookups: stats.total_lookups,
            threats_detected: stats.threats_detected,
            critical_threats: stats.critical_threats,
        }
    }

    /// Replace the counters with persisted values
    pub fn restore(&self, snapshot: &StatsSnapshot) {
        self.total_lookups.store(snapshot.total_lookups, Ordering::Relaxed);
        self.threats_detected.store(snapshot.threats_detected, Ordering::Relaxed);
        self.critical_threats.store(snapshot.critical_threats, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lookup_by_level() {
        let stats = StatsCollector::new(3);
        stats.record_lookup(ThreatLevel::Info);
        stats.record_lookup(ThreatLevel::Low);
        stats.record_lookup(ThreatLevel::Medium);
        stats.record_lookup(ThreatLevel::High);
        stats.record_lookup(ThreatLevel::Critical);

        let s = stats.get_stats();
        assert_eq!(s.total_lookups, 5);
        assert_eq!(s.threats_detected, 3);
        assert_eq!(s.critical_threats, 1);
        assert_eq!(s.active_sources, 3);
    }

    #[test]
    fn test_reset_keeps_active_sources() {
        let stats = StatsCollector::new(2);
        stats.record_lookup(ThreatLevel::Critical);
        stats.reset();

        let s = stats.get_stats();
        assert_eq!(s.total_lookups, 0);
        assert_eq!(s.critical_threats, 0);
        assert_eq!(s.active_sources, 2);
    }

    #[test]
    fn test_snapshot_restore() {
        let stats = StatsCollector::new(1);
        stats.record_lookup(ThreatLevel::High);

        let restored = StatsCollector::new(1);
        restored.restore(&stats.snapshot());
        assert_eq!(restored.get_stats(), stats.get_stats());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(StatsCollector::new(3).get_stats()).unwrap();
        assert_eq!(json["totalLookups"], 0);
        assert_eq!(json["activeSources"], 3);
    }
}
