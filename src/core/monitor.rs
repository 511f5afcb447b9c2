//! Performance counters for a pagination session

use std::time::Duration;

use serde::Serialize;

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub server_fetches: u64,
    pub fetch_failures: u64,
    pub retries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub stale_discards: u64,
    pub rejected_requests: u64,
    pub client_slices: u64,
    pub slow_slices: u64,
    pub auto_fetch_rounds: u64,
    pub evicted_items: u64,
    pub peak_store_len: usize,
    pub total_fetch_time: Duration,
    pub last_fetch_time: Option<Duration>,
}

impl MetricsSnapshot {
    pub fn average_fetch_time(&self) -> Option<Duration> {
        let fetches = u32::try_from(self.server_fetches).ok().filter(|n| *n > 0)?;
        Some(self.total_fetch_time / fetches)
    }

    pub fn cache_hit_ratio(&self) -> Option<f64> {
        let lookups = self.cache_hits + self.cache_misses;
        (lookups > 0).then(|| self.cache_hits as f64 / lookups as f64)
    }
}

/// Tracks timing and memory metrics
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    metrics: MetricsSnapshot,
    slice_budget: Duration,
}

impl PerformanceMonitor {
    pub fn new(slice_budget: Duration) -> Self {
        Self {
            metrics: MetricsSnapshot::default(),
            slice_budget,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.clone()
    }

    pub fn record_fetch(&mut self, elapsed: Duration) {
        self.metrics.server_fetches += 1;
        self.metrics.total_fetch_time += elapsed;
        self.metrics.last_fetch_time = Some(elapsed);
    }

    pub fn record_fetch_failure(&mut self) {
        self.metrics.fetch_failures += 1;
    }

    pub fn record_retry(&mut self) {
        self.metrics.retries += 1;
    }

    pub fn record_cache_lookup(&mut self, hit: bool) {
        if hit {
            self.metrics.cache_hits += 1;
        } else {
            self.metrics.cache_misses += 1;
        }
    }

    pub fn record_stale_discard(&mut self) {
        self.metrics.stale_discards += 1;
    }

    pub fn record_rejected_request(&mut self) {
        self.metrics.rejected_requests += 1;
    }

    pub fn record_auto_fetch_round(&mut self) {
        self.metrics.auto_fetch_rounds += 1;
    }

    /// Record a client-side slice; returns `true` if it blew the slice budget
    pub fn record_slice(&mut self, elapsed: Duration) -> bool {
        self.metrics.client_slices += 1;
        let slow = elapsed > self.slice_budget;
        if slow {
            self.metrics.slow_slices += 1;
            tracing::warn!(?elapsed, budget = ?self.slice_budget, "client slice exceeded its budget");
        }
        slow
    }

    pub fn record_store_len(&mut self, len: usize, evicted: usize) {
        self.metrics.peak_store_len = self.metrics.peak_store_len.max(len);
        self.metrics.evicted_items += evicted as u64;
    }
}
