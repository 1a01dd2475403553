//! Dispatch metrics of a CPU device.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// one hour in nanoseconds
const MAX_LATENCY_NS: u64 = 3_600_000_000_000;

/// Counters and latency histogram updated by every kernel run.
#[derive(Debug)]
pub struct DispatchMetrics {
    dispatches: AtomicU64,
    failed_dispatches: AtomicU64,
    work_groups: AtomicU64,
    batches: AtomicU64,
    work_items: AtomicU64,

    latency_histogram: RwLock<Option<Histogram<u64>>>,

    start_time: Instant,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_max(MAX_LATENCY_NS, 3).ok();
        if histogram.is_none() {
            tracing::warn!("latency histogram unavailable");
        }

        Self {
            dispatches: AtomicU64::new(0),
            failed_dispatches: AtomicU64::new(0),
            work_groups: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            work_items: AtomicU64::new(0),
            latency_histogram: RwLock::new(histogram),
            start_time: Instant::now(),
        }
    }

    /// One claimed batch of `groups` work-groups has finished.
    pub fn record_batch(&self, groups: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.work_groups.fetch_add(groups as u64, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, elapsed: Duration, work_items: usize, succeeded: bool) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.failed_dispatches.fetch_add(1, Ordering::Relaxed);
        }
        self.work_items.fetch_add(work_items as u64, Ordering::Relaxed);

        let ns = (elapsed.as_nanos() as u64).clamp(1, MAX_LATENCY_NS);
        if let Some(hist) = self.latency_histogram.write().as_mut() {
            let _ = hist.record(ns);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.latency_histogram.read();
        let quantile = |q: f64| {
            histogram
                .as_ref()
                .map_or(0, |h| h.value_at_quantile(q))
        };

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            failed_dispatches: self.failed_dispatches.load(Ordering::Relaxed),
            work_groups: self.work_groups.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            work_items: self.work_items.load(Ordering::Relaxed),
            avg_latency_ns: histogram
                .as_ref()
                .filter(|h| !h.is_empty())
                .map_or(0, |h| h.mean() as u64),
            p50_latency_ns: quantile(0.50),
            p95_latency_ns: quantile(0.95),
            p99_latency_ns: quantile(0.99),
            max_latency_ns: histogram.as_ref().map_or(0, |h| h.max()),
        }
    }

    pub fn reset(&self) {
        self.dispatches.store(0, Ordering::Relaxed);
        self.failed_dispatches.store(0, Ordering::Relaxed);
        self.work_groups.store(0, Ordering::Relaxed);
        self.batches.store(0, Ordering::Relaxed);
        self.work_items.store(0, Ordering::Relaxed);

        if let Some(hist) = self.latency_histogram.write().as_mut() {
            hist.reset();
        }
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
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
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.dispatches as f64 / seconds
    }

    /// Mean number of work-groups per claimed batch.
    pub fn groups_per_batch(&self) -> f64 {
        if self.batches == 0 {
            return 0.0;
        }
        self.work_groups as f64 / self.batches as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = DispatchMetrics::new();

        metrics.record_batch(8);
        metrics.record_batch(4);
        metrics.record_dispatch(Duration::from_micros(5), 96, true);
        metrics.record_dispatch(Duration::from_micros(9), 10, false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.dispatches, 2);
        assert_eq!(snapshot.failed_dispatches, 1);
        assert_eq!(snapshot.work_groups, 12);
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.work_items, 106);
        assert_eq!(snapshot.groups_per_batch(), 6.0);
        assert!(snapshot.avg_latency_ns > 0);
        assert!(snapshot.max_latency_ns >= snapshot.p50_latency_ns);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = DispatchMetrics::new();

        metrics.record_dispatch(Duration::from_millis(1), 1, true);
        assert_eq!(metrics.snapshot().dispatches, 1);

        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.dispatches, 0);
        assert_eq!(snapshot.avg_latency_ns, 0);
    }
}
