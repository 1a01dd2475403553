//! Dispatch metrics.
//!
//! With the `telemetry` feature off, a stub with the same API is compiled
//! and every recording call is a no-op.

#[cfg(feature = "telemetry")]
pub mod metrics;

pub use metrics::{DispatchMetrics, MetricsSnapshot};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::Duration;

    #[derive(Debug, Default)]
    pub struct DispatchMetrics;

    impl DispatchMetrics {
        pub fn new() -> Self {
            Self
        }
        pub fn record_batch(&self, _: usize) {}
        pub fn record_dispatch(&self, _: Duration, _: usize, _: bool) {}
        pub fn snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
        pub fn reset(&self) {}
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub uptime: Duration,
        pub dispatches: u64,
        pub failed_dispatches: u64,
        pub work_groups: u64,
        pub batches: u64,
        pub work_items: u64,
        pub avg_latency_ns: u64,
        pub p50_latency_ns: u64,
        pub p95_latency_ns: u64,
        pub p99_latency_ns: u64,
        pub max_latency_ns: u64,
    }

    impl MetricsSnapshot {
        pub fn dispatches_per_second(&self) -> f64 {
            0.0
        }
        pub fn groups_per_batch(&self) -> f64 {
            0.0
        }
    }
}
