//! Metrics collection for cache and fetch operations.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics collector for cache operations.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    /// Number of lookups served from the cache.
    pub hits: Arc<AtomicU64>,
    /// Number of lookups that found nothing usable.
    pub misses: Arc<AtomicU64>,
    /// Number of entries written.
    pub stores: Arc<AtomicU64>,
    /// Number of entries evicted because their TTL elapsed.
    pub expirations: Arc<AtomicU64>,
    /// Number of entries removed by explicit invalidation.
    pub invalidations: Arc<AtomicU64>,
    /// Number of backend fetches performed on a miss.
    pub fetches: Arc<AtomicU64>,
    /// Number of backend fetches that failed.
    pub fetch_failures: Arc<AtomicU64>,
    /// Slowest fetch observed per latency bucket.
    pub fetch_durations: Arc<DashMap<String, Duration>>,
    /// Invalidated entry counts by cache family.
    pub family_invalidations: Arc<DashMap<String, AtomicU64>>,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            stores: Arc::new(AtomicU64::new(0)),
            expirations: Arc::new(AtomicU64::new(0)),
            invalidations: Arc::new(AtomicU64::new(0)),
            fetches: Arc::new(AtomicU64::new(0)),
            fetch_failures: Arc::new(AtomicU64::new(0)),
            fetch_durations: Arc::new(DashMap::new()),
            family_invalidations: Arc::new(DashMap::new()),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.record_expirations(1);
    }

    /// Record `count` entries removed because their TTL elapsed.
    pub fn record_expirations(&self, count: usize) {
        self.expirations
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record `count` entries removed by explicit invalidation.
    pub fn record_invalidations(&self, count: usize) {
        self.invalidations
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record entries removed by a family-wide invalidation.
    pub fn record_family_invalidation(&self, family: &str, count: usize) {
        self.record_invalidations(count);
        self.family_invalidations
            .entry(family.to_string())
            .and_modify(|total| {
                total.fetch_add(count as u64, Ordering::Relaxed);
            })
            .or_insert_with(|| AtomicU64::new(count as u64));
    }

    /// Record a completed backend fetch and its latency.
    pub fn record_fetch(&self, duration: Duration, succeeded: bool) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        }

        let bucket = duration_to_bucket(duration);
        self.fetch_durations
            .entry(bucket)
            .and_modify(|existing| {
                if duration > *existing {
                    *existing = duration;
                }
            })
            .or_insert(duration);
    }

    /// Get cache hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Get metrics summary.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            hit_ratio: self.hit_ratio(),
            stores: self.stores.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            family_invalidations: self
                .family_invalidations
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.stores.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
        self.invalidations.store(0, Ordering::Relaxed);
        self.fetches.store(0, Ordering::Relaxed);
        self.fetch_failures.store(0, Ordering::Relaxed);
        self.fetch_durations.clear();
        self.family_invalidations.clear();
    }
}

fn duration_to_bucket(duration: Duration) -> String {
    let micros = duration.as_micros();
    match micros {
        0..=999 => "0-999μs".to_string(),
        1000..=9999 => "1-9ms".to_string(),
        10000..=99999 => "10-99ms".to_string(),
        100000..=999999 => "100-999ms".to_string(),
        _ => "1s+".to_string(),
    }
}

/// Summary of metrics.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    pub stores: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub family_invalidations: HashMap<String, u64>,
}

/// Timer measuring a backend fetch; call [`FetchTimer::finish`] with the outcome.
pub struct FetchTimer {
    start: Instant,
    metrics: CacheMetrics,
}

impl FetchTimer {
    /// Start timing a fetch.
    pub fn start(metrics: &CacheMetrics) -> Self {
        Self {
            start: Instant::now(),
            metrics: metrics.clone(),
        }
    }

    /// Stop the timer and record the fetch outcome.
    pub fn finish(self, succeeded: bool) {
        self.metrics.record_fetch(self.start.elapsed(), succeeded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_basic_operations() {
        let metrics = CacheMetrics::new();

        metrics.record_hit();
        metrics.record_miss();
        assert_eq!(metrics.hits.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.misses.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.hit_ratio(), 0.5);

        metrics.record_store();
        metrics.record_expiration();
        metrics.record_expirations(2);
        metrics.record_family_invalidation("roles", 3);
        metrics.record_family_invalidation("roles", 2);
        assert_eq!(metrics.stores.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.expirations.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.invalidations.load(Ordering::Relaxed), 5);
        assert_eq!(
            metrics
                .family_invalidations
                .get("roles")
                .unwrap()
                .load(Ordering::Relaxed),
            5
        );
    }

    #[test]
    fn test_metrics_summary_and_reset() {
        let metrics = CacheMetrics::new();

        metrics.record_hit();
        metrics.record_fetch(Duration::from_millis(2), true);
        metrics.record_fetch(Duration::from_millis(3), false);

        let summary = metrics.summary();
        assert_eq!(summary.hits, 1);
        assert_eq!(summary.fetches, 2);
        assert_eq!(summary.fetch_failures, 1);
        assert_eq!(summary.hit_ratio, 1.0);

        metrics.reset();
        let summary = metrics.summary();
        assert_eq!(summary.hits, 0);
        assert_eq!(summary.fetches, 0);
        assert!(summary.family_invalidations.is_empty());
        assert!(metrics.fetch_durations.is_empty());
    }

    #[test]
    fn test_fetch_timer() {
        let metrics = CacheMetrics::new();

        let timer = FetchTimer::start(&metrics);
        thread::sleep(Duration::from_millis(1));
        timer.finish(true);

        assert_eq!(metrics.fetches.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.fetch_failures.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.fetch_durations.len(), 1);
    }

    #[test]
    fn test_duration_bucketing() {
        assert_eq!(duration_to_bucket(Duration::from_micros(50)), "0-999μs");
        assert_eq!(duration_to_bucket(Duration::from_millis(5)), "1-9ms");
        assert_eq!(duration_to_bucket(Duration::from_millis(50)), "10-99ms");
        assert_eq!(duration_to_bucket(Duration::from_millis(500)), "100-999ms");
        assert_eq!(duration_to_bucket(Duration::from_secs(2)), "1s+");
    }
}
