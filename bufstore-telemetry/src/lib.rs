//! # bufstore Telemetry
//!
//! Logging setup and Prometheus export for buffer pool statistics.

pub mod logging;
pub mod metrics;

pub use logging::PoolLogger;
pub use metrics::PoolMetrics;
