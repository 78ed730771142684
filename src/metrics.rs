//! Cache Metrics Module
//!
//! Records cache-level counters (hits, misses, evictions, expirations) and
//! gauges (resident entries, estimated memory).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Metrics Sink ==
/// Destination for cache instrumentation.
///
/// Implementations are called from inside the cache's critical sections, so
/// they must be cheap and must not block.
pub trait MetricsSink: Send + Sync {
    fn record_hit(&self);
    fn record_miss(&self);
    fn record_eviction(&self);
    fn record_expired(&self);
    fn update_size(&self, entries: usize);
    fn update_memory(&self, bytes: usize);
}

// == Cache Metrics ==
/// Lock-free [`MetricsSink`] backed by atomic counters.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
    entries: AtomicU64,
    memory_bytes: AtomicU64,
}

impl CacheMetrics {
    /// Creates a new CacheMetrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a point-in-time copy of every counter and gauge.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed),
            memory_bytes: self.memory_bytes.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for CacheMetrics {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    fn update_size(&self, entries: usize) {
        self.entries.store(entries as u64, Ordering::Relaxed);
    }

    fn update_memory(&self, bytes: usize) {
        self.memory_bytes.store(bytes as u64, Ordering::Relaxed);
    }
}

// == Metrics Snapshot ==
/// Serializable view of [`CacheMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Reads answered from memory or repaired from the durable store
    pub hits: u64,
    /// Reads found nowhere
    pub misses: u64,
    /// Entries dropped by LRU pressure
    pub evictions: u64,
    /// Entries discovered expired on read
    pub expired: u64,
    /// Resident entry count
    pub entries: u64,
    /// Estimated bytes held by resident entries
    pub memory_bytes: u64,
}

impl MetricsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
