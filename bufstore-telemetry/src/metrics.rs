//! ## bufstore-telemetry::metrics
//! **Prometheus export of buffer pool statistics**
//!
//! Gauges mirror the current pool levels; counters follow the pool's
//! monotonic event counts and only ever move forward.

use bufstore_core::PoolStats;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub registry: Registry,
    capacity: IntGauge,
    available: IntGauge,
    outstanding: IntGauge,
    locked: IntGauge,
    utilization: Gauge,
    acquisitions: IntCounter,
    releases: IntCounter,
    locked_release_skips: IntCounter,
    unlock_releases: IntCounter,
    foreign_releases: IntCounter,
    exhaustion_failures: IntCounter,
}

impl PoolMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let capacity = IntGauge::new("bufstore_pool_capacity", "Buffers in the arena")?;
        let available = IntGauge::new("bufstore_pool_available", "Buffers on the free list")?;
        let outstanding = IntGauge::new(
            "bufstore_pool_outstanding",
            "Buffers held by callers, locked ones included",
        )?;
        let locked = IntGauge::new("bufstore_pool_locked", "Buffers with their lock bit set")?;
        let utilization = Gauge::new(
            "bufstore_pool_utilization_ratio",
            "Fraction of buffers outstanding",
        )?;
        let acquisitions =
            IntCounter::new("bufstore_acquisitions_total", "Successful buffer acquisitions")?;
        let releases = IntCounter::new(
            "bufstore_releases_total",
            "Buffers returned to the free list by release",
        )?;
        let locked_release_skips = IntCounter::new(
            "bufstore_locked_release_skips_total",
            "Release calls ignored because the buffer was locked",
        )?;
        let unlock_releases = IntCounter::new(
            "bufstore_unlock_releases_total",
            "Buffers returned by unlock_and_release",
        )?;
        let foreign_releases = IntCounter::new(
            "bufstore_foreign_releases_total",
            "Released addresses not owned by the pool",
        )?;
        let exhaustion_failures = IntCounter::new(
            "bufstore_exhaustion_failures_total",
            "Acquire calls that found the pool empty",
        )?;

        registry.register(Box::new(capacity.clone()))?;
        registry.register(Box::new(available.clone()))?;
        registry.register(Box::new(outstanding.clone()))?;
        registry.register(Box::new(locked.clone()))?;
        registry.register(Box::new(utilization.clone()))?;
        registry.register(Box::new(acquisitions.clone()))?;
        registry.register(Box::new(releases.clone()))?;
        registry.register(Box::new(locked_release_skips.clone()))?;
        registry.register(Box::new(unlock_releases.clone()))?;
        registry.register(Box::new(foreign_releases.clone()))?;
        registry.register(Box::new(exhaustion_failures.clone()))?;

        Ok(Self {
            registry,
            capacity,
            available,
            outstanding,
            locked,
            utilization,
            acquisitions,
            releases,
            locked_release_skips,
            unlock_releases,
            foreign_releases,
            exhaustion_failures,
        })
    }

    /// Updates every metric from a pool snapshot.
    pub fn observe(&self, stats: &PoolStats) {
        self.capacity.set(stats.capacity as i64);
        self.available.set(stats.available as i64);
        self.outstanding.set(stats.outstanding as i64);
        self.locked.set(stats.locked as i64);
        self.utilization.set(stats.utilization());

        advance(&self.acquisitions, stats.acquisitions);
        advance(&self.releases, stats.releases);
        advance(&self.locked_release_skips, stats.locked_release_skips);
        advance(&self.unlock_releases, stats.unlock_releases);
        advance(&self.foreign_releases, stats.foreign_releases);
        advance(&self.exhaustion_failures, stats.exhaustion_failures);
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Moves `counter` up to `total`. Smaller totals (a newer pool) are ignored.
fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_sets_levels_and_counters() {
        let metrics = PoolMetrics::new().unwrap();
        let mut stats = PoolStats {
            capacity: 4,
            available: 1,
            outstanding: 3,
            locked: 1,
            acquisitions: 5,
            releases: 2,
            ..Default::default()
        };
        metrics.observe(&stats);
        assert_eq!(metrics.available.get(), 1);
        assert_eq!(metrics.acquisitions.get(), 5);

        stats.acquisitions = 9;
        stats.available = 4;
        metrics.observe(&stats);
        assert_eq!(metrics.acquisitions.get(), 9);
        assert_eq!(metrics.available.get(), 4);

        stats.acquisitions = 1;
        metrics.observe(&stats);
        assert_eq!(metrics.acquisitions.get(), 9);
    }

    #[test]
    fn gathers_text_format() {
        let metrics = PoolMetrics::new().unwrap();
        metrics.observe(&PoolStats {
            capacity: 16,
            available: 16,
            ..Default::default()
        });
        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("bufstore_pool_capacity 16"));
        assert!(text.contains("bufstore_exhaustion_failures_total 0"));
    }
}
