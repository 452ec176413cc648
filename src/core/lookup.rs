//! Lookup orchestration: store first, aggregate on a miss

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::aggregator::ThreatAggregator;
use crate::models::{Indicator, IocRecord};
use crate::utils::cache::IocStore;
use crate::utils::telemetry::StatsCollector;

pub struct LookupService {
    aggregator: ThreatAggregator,
    store: Arc<IocStore>,
    stats: Arc<StatsCollector>,
    freshness: Duration,
}

impl LookupService {
    pub fn new(
        aggregator: ThreatAggregator,
        store: Arc<IocStore>,
        stats: Arc<StatsCollector>,
        freshness: Duration,
    ) -> Self {
        Self {
            aggregator,
            store,
            stats,
            freshness,
        }
    }

    /// Record for the indicator and whether it came from the store
    pub async fn lookup(&self, ioc: &Indicator) -> (IocRecord, bool) {
        if let Some(record) = self.store.find_fresh(ioc, self.freshness) {
            info!("⚡ Returning cached result for {}", ioc);
            return (record, true);
        }

        info!("🔍 CACHE MISS - querying sources for {}", ioc);
        let report = self.aggregator.analyze(ioc).await;
        let level = report.threat_level;
        let record = self.store.upsert(report);
        self.stats.record_lookup(level);

        (record, false)
    }
}
