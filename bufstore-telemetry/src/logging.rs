//! ## bufstore-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Installs the process-wide fmt subscriber and emits pool snapshots as
//! structured events. `RUST_LOG` takes precedence over the configured level.

use bufstore_core::PoolStats;
use tracing::{info, info_span, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Utilization above which snapshots are logged at `warn`.
const HIGH_WATER_MARK: f64 = 0.9;

#[derive(Clone)]
pub struct PoolLogger;

impl PoolLogger {
    /// Installs the global subscriber.
    ///
    /// # Panics
    /// If a global subscriber is already set.
    pub fn init(default_level: &str) {
        Self::builder(default_level).init()
    }

    fn builder(
        default_level: &str,
    ) -> fmt::SubscriberBuilder<fmt::format::DefaultFields, fmt::format::Format, EnvFilter> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
    }

    /// Logs a pool snapshot under a `pool_snapshot` span.
    pub fn log_snapshot(pool: &str, stats: &PoolStats) {
        let span = info_span!("pool_snapshot", pool = pool);
        let _enter = span.enter();

        if stats.utilization() >= HIGH_WATER_MARK {
            warn!(
                capacity = stats.capacity,
                available = stats.available,
                locked = stats.locked,
                "Buffer pool near exhaustion"
            );
        } else {
            info!(
                capacity = stats.capacity,
                available = stats.available,
                outstanding = stats.outstanding,
                locked = stats.locked,
                foreign_releases = stats.foreign_releases,
                "Buffer pool snapshot"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_snapshot_logging() {
        let stats = PoolStats {
            capacity: 8,
            available: 6,
            outstanding: 2,
            ..Default::default()
        };
        PoolLogger::log_snapshot("rx", &stats);
        assert!(logs_contain("Buffer pool snapshot"));
        assert!(!logs_contain("near exhaustion"));
    }

    #[traced_test]
    #[test]
    fn test_high_water_mark_warns() {
        let stats = PoolStats {
            capacity: 10,
            available: 0,
            outstanding: 10,
            ..Default::default()
        };
        PoolLogger::log_snapshot("tx", &stats);
        assert!(logs_contain("Buffer pool near exhaustion"));
    }
}
