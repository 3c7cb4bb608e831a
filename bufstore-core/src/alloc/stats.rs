//! ## bufstore-core::alloc::stats
//! **Buffer pool usage counters and snapshots**
//!
//! The pool is single-threaded, so the counters are plain integers updated
//! under `&mut`. [`PoolStats`] is the copyable snapshot handed to telemetry.

use serde::Serialize;

/// Running event counters kept by a [`BufferStore`](super::pool::BufferStore).
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PoolCounters {
    pub(crate) acquisitions: u64,
    pub(crate) releases: u64,
    pub(crate) locked_release_skips: u64,
    pub(crate) unlock_releases: u64,
    pub(crate) foreign_releases: u64,
    pub(crate) exhaustion_failures: u64,
}

/// Point-in-time view of a pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Total buffers in the arena.
    pub capacity: usize,
    /// Buffers on the free list.
    pub available: usize,
    /// Buffers held by callers, locked ones included.
    pub outstanding: usize,
    /// Buffers whose lock bit is currently set.
    pub locked: usize,
    /// Successful `acquire` calls.
    pub acquisitions: u64,
    /// Pool buffers returned to the free list by `release`.
    pub releases: u64,
    /// `release` calls ignored because the buffer was locked.
    pub locked_release_skips: u64,
    /// Pool buffers returned by `unlock_and_release`.
    pub unlock_releases: u64,
    /// Addresses handed to the foreign disposal path.
    pub foreign_releases: u64,
    /// `acquire` calls that found the free list empty.
    pub exhaustion_failures: u64,
}

impl PoolStats {
    pub(crate) fn new(capacity: usize, available: usize, locked: usize, counters: &PoolCounters) -> Self {
        Self {
            capacity,
            available,
            outstanding: capacity - available,
            locked,
            acquisitions: counters.acquisitions,
            releases: counters.releases,
            locked_release_skips: counters.locked_release_skips,
            unlock_releases: counters.unlock_releases,
            foreign_releases: counters.foreign_releases,
            exhaustion_failures: counters.exhaustion_failures,
        }
    }

    /// Fraction of the pool currently outstanding, in `[0.0, 1.0]`.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.outstanding as f64 / self.capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_derives_outstanding() {
        let counters = PoolCounters {
            acquisitions: 7,
            releases: 3,
            ..Default::default()
        };
        let stats = PoolStats::new(8, 4, 1, &counters);
        assert_eq!(stats.outstanding, 4);
        assert_eq!(stats.acquisitions, 7);
        assert_eq!(stats.releases, 3);
        assert!((stats.utilization() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot_has_zero_utilization() {
        assert_eq!(PoolStats::default().utilization(), 0.0);
    }
}
