//! Cache Engine Module
//!
//! Bounded in-memory cache with LRU eviction and lazy TTL expiry, written
//! through to a durable store and read through from it on misses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheEntry, LruTracker};
use crate::config::Config;
use crate::metrics::MetricsSink;
use crate::persistence::{wall_clock_expiry, DurableStore, DurableWriter};
use crate::tasks::Janitor;

// == Cache Options ==
/// Sizing and timing knobs for [`DurableCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of resident entries (at least 1)
    pub capacity: usize,
    /// TTL applied when a caller passes none or zero
    pub default_ttl: Duration,
    /// Interval between durable store sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: 1024,
            default_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl From<&Config> for CacheOptions {
    fn from(config: &Config) -> Self {
        Self {
            capacity: config.max_entries,
            default_ttl: config.default_ttl(),
            sweep_interval: config.cleanup_interval(),
        }
    }
}

// == Cache State ==
/// Entry map and recency order, always mutated together under one lock.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    memory_bytes: usize,
    /// Number of puts applied so far
    writes: u64,
}

enum Lookup {
    Fresh(String),
    Expired,
    Absent,
}

impl CacheState {
    /// Reads `key`, touching it on a hit and dropping it if stale.
    fn lookup(&mut self, key: &str, now: Instant) -> Lookup {
        let fresh = match self.entries.get(key) {
            Some(entry) if entry.is_fresh_at(now) => Some(entry.value.clone()),
            Some(_) => None,
            None => return Lookup::Absent,
        };

        match fresh {
            Some(value) => {
                self.lru.touch(key);
                Lookup::Fresh(value)
            }
            None => {
                self.remove(key);
                Lookup::Expired
            }
        }
    }

    /// Inserts or replaces `key`, returning the key evicted to make room.
    fn insert(&mut self, key: String, entry: CacheEntry, capacity: usize) -> Option<String> {
        let mut evicted = None;

        if !self.entries.contains_key(&key) && self.entries.len() >= capacity {
            if let Some(oldest) = self.lru.evict_oldest() {
                if let Some(old) = self.entries.remove(&oldest) {
                    self.memory_bytes -= old.footprint(&oldest);
                }
                evicted = Some(oldest);
            }
        }

        self.lru.touch(&key);
        self.memory_bytes += entry.footprint(&key);
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.memory_bytes -= old.footprint(&key);
        }

        evicted
    }

    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.memory_bytes -= old.footprint(key);
        }
        self.lru.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.memory_bytes = 0;
    }
}

// == Durable Cache ==
/// Write-through, read-through cache in front of a [`DurableStore`].
///
/// Memory is authoritative while the process lives; the durable store is
/// best effort. Two clocks govern freshness: resident entries expire on the
/// monotonic clock, durable rows on the wall clock. Entries repaired from
/// the store get a fresh default TTL rather than the row's remaining lifetime.
///
/// Must be created inside a tokio runtime. Call [`DurableCache::shutdown`]
/// before dropping to drain pending durable writes.
pub struct DurableCache {
    state: Mutex<CacheState>,
    store: Arc<dyn DurableStore>,
    metrics: Arc<dyn MetricsSink>,
    writer: DurableWriter,
    janitor: Mutex<Option<Janitor>>,
    capacity: usize,
    default_ttl: Duration,
}

impl DurableCache {
    // == Constructor ==
    /// Creates the cache and starts its durable writer and janitor.
    pub fn new(
        store: Arc<dyn DurableStore>,
        metrics: Arc<dyn MetricsSink>,
        options: CacheOptions,
    ) -> Self {
        let capacity = options.capacity.max(1);
        let writer = DurableWriter::spawn(store.clone());
        let janitor = Janitor::spawn(store.clone(), options.sweep_interval);

        metrics.update_size(0);
        metrics.update_memory(0);
        info!(
            capacity,
            default_ttl = ?options.default_ttl,
            "Cache initialized"
        );

        Self {
            state: Mutex::new(CacheState::default()),
            store,
            metrics,
            writer,
            janitor: Mutex::new(Some(janitor)),
            capacity,
            default_ttl: options.default_ttl,
        }
    }

    // == Put ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// A `ttl` of `None` or zero means the default TTL. The durable write is
    /// queued, not awaited, but it is queued under the cache lock so the
    /// store sees writes in the same order memory does.
    pub async fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Option<Duration>,
    ) {
        let key = key.into();
        let value = value.into();
        let ttl = self.effective_ttl(ttl);

        let mut state = self.state.lock().await;
        self.write_locked(&mut state, key, value, ttl);
    }

    // == Get ==
    /// Returns the value for `key` from memory, or from the durable store.
    ///
    /// The cache lock is released while the store is queried.
    pub async fn get(&self, key: &str) -> Option<String> {
        let writes_seen = {
            let mut state = self.state.lock().await;
            match state.lookup(key, Instant::now()) {
                Lookup::Fresh(value) => {
                    self.metrics.record_hit();
                    return Some(value);
                }
                Lookup::Expired => {
                    debug!(key, "Entry expired in memory");
                    self.metrics.record_expired();
                    self.report_gauges(&state);
                }
                Lookup::Absent => {}
            }
            state.writes
        };

        // Queued puts must land before the store is read, or it answers
        // with a value memory already replaced.
        self.writer.flush().await;

        match self.store.get(key).await {
            Some(value) => {
                self.metrics.record_hit();
                Some(self.repair(key, value, writes_seen).await)
            }
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Re-admits a value read from the durable store, in memory only. The
    /// durable row already holds it, so nothing is queued.
    ///
    /// If a `put` landed while the store was being queried, the newer
    /// resident value wins and is returned instead. If any put landed and
    /// has since left memory, the read value is returned but not admitted.
    async fn repair(&self, key: &str, value: String, writes_seen: u64) -> String {
        let mut state = self.state.lock().await;
        match state.lookup(key, Instant::now()) {
            Lookup::Fresh(current) => return current,
            Lookup::Expired => self.metrics.record_expired(),
            Lookup::Absent => {}
        }

        if state.writes != writes_seen {
            debug!(key, "Write raced the durable read, skipping repopulation");
            return value;
        }

        debug!(key, "Repopulating entry from durable store");
        self.admit_locked(&mut state, key.to_string(), value.clone(), self.default_ttl);
        value
    }

    fn write_locked(&self, state: &mut CacheState, key: String, value: String, ttl: Duration) {
        self.writer
            .submit(key.clone(), value.clone(), wall_clock_expiry(ttl));
        state.writes += 1;
        self.admit_locked(state, key, value, ttl);
    }

    fn admit_locked(&self, state: &mut CacheState, key: String, value: String, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl);
        if let Some(evicted) = state.insert(key, entry, self.capacity) {
            debug!(key = %evicted, "Evicted least recently used entry");
            self.metrics.record_eviction();
        }
        self.report_gauges(state);
    }

    // == Contains ==
    /// Whether `key` is resident and fresh. Side-effect free: recency and
    /// metrics are left untouched and the store is never consulted.
    pub async fn contains(&self, key: &str) -> bool {
        let state = self.state.lock().await;
        state
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh_at(Instant::now()))
    }

    // == Clear ==
    /// Empties memory. Durable rows are left alone.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.clear();
        self.report_gauges(&state);
        info!("Cache cleared");
    }

    // == Size ==
    /// Current resident entry count, expired-but-unread entries included.
    pub async fn size(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Estimated bytes held by resident entries.
    pub async fn memory_estimate(&self) -> usize {
        self.state.lock().await.memory_bytes
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Waits until every durable write queued so far has been applied.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    // == Shutdown ==
    /// Stops the janitor, then drains pending durable writes.
    pub async fn shutdown(&self) {
        if let Some(janitor) = self.janitor.lock().await.take() {
            janitor.stop().await;
        }
        self.writer.shutdown().await;
        info!("Cache shut down");
    }

    fn effective_ttl(&self, ttl: Option<Duration>) -> Duration {
        match ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => self.default_ttl,
        }
    }

    fn report_gauges(&self, state: &CacheState) {
        self.metrics.update_size(state.entries.len());
        self.metrics.update_memory(state.memory_bytes);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::CacheMetrics;
    use crate::persistence::MemoryStore;
    use chrono::{TimeDelta, Utc};

    struct Fixture {
        cache: DurableCache,
        store: Arc<MemoryStore>,
        metrics: Arc<CacheMetrics>,
    }

    fn fixture(capacity: usize, default_ttl: Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(CacheMetrics::new());
        let cache = DurableCache::new(
            store.clone(),
            metrics.clone(),
            CacheOptions {
                capacity,
                default_ttl,
                sweep_interval: Duration::from_secs(3600),
            },
        );
        Fixture {
            cache,
            store,
            metrics,
        }
    }

    async fn assert_consistent(cache: &DurableCache) {
        let state = cache.state.lock().await;
        assert!(state.entries.len() <= cache.capacity);
        assert_eq!(state.entries.len(), state.lru.len());
        for key in state.lru.keys_by_recency() {
            assert!(state.entries.contains_key(key), "{} tracked but not stored", key);
        }
        let expected: usize = state
            .entries
            .iter()
            .map(|(k, e)| e.footprint(k))
            .sum();
        assert_eq!(state.memory_bytes, expected);
    }

    async fn recency(cache: &DurableCache) -> Vec<String> {
        let state = cache.state.lock().await;
        state.lru.keys_by_recency().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let f = fixture(10, Duration::from_secs(300));

        f.cache.put("key1", "value1", None).await;

        assert_eq!(f.cache.get("key1").await.as_deref(), Some("value1"));
        assert_eq!(f.cache.size().await, 1);
        assert_eq!(f.metrics.snapshot().hits, 1);
        assert_eq!(f.store.lookups(), 0, "memory hit must not reach the store");
    }

    #[tokio::test]
    async fn test_get_missing_records_miss() {
        let f = fixture(10, Duration::from_secs(300));

        assert!(f.cache.get("nonexistent").await.is_none());
        assert_eq!(f.metrics.snapshot().misses, 1);
        assert_eq!(f.store.lookups(), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites_and_moves_to_front() {
        let f = fixture(10, Duration::from_secs(300));

        f.cache.put("a", "1", None).await;
        f.cache.put("b", "2", None).await;
        f.cache.put("a", "3", None).await;

        assert_eq!(f.cache.size().await, 2);
        assert_eq!(recency(&f.cache).await, vec!["a", "b"]);
        assert_eq!(f.cache.get("a").await.as_deref(), Some("3"));
        assert_consistent(&f.cache).await;
    }

    #[tokio::test]
    async fn test_put_writes_through() {
        let f = fixture(10, Duration::from_secs(300));

        f.cache.put("k", "v", Some(Duration::from_secs(60))).await;
        f.cache.flush().await;

        let row = f.store.row("k").await.unwrap();
        assert_eq!(row.value, "v");
        assert!(row.expiry > Utc::now() + TimeDelta::seconds(55));
        assert!(row.expiry <= Utc::now() + TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn test_zero_ttl_uses_default() {
        let f = fixture(10, Duration::from_secs(300));

        f.cache.put("k", "v", Some(Duration::ZERO)).await;
        f.cache.flush().await;

        let row = f.store.row("k").await.unwrap();
        assert!(row.expiry > Utc::now() + TimeDelta::seconds(290));
        assert!(f.cache.contains("k").await);
    }

    #[tokio::test]
    async fn test_capacity_scenario() {
        let f = fixture(3, Duration::from_secs(300));

        f.cache.put("a", "1", None).await;
        f.cache.put("b", "2", None).await;
        f.cache.put("c", "3", None).await;
        assert_eq!(recency(&f.cache).await, vec!["c", "b", "a"]);

        assert!(f.cache.get("a").await.is_some());
        assert_eq!(recency(&f.cache).await, vec!["a", "c", "b"]);

        f.cache.put("d", "4", None).await;
        assert_eq!(recency(&f.cache).await, vec!["d", "a", "c"]);
        assert_eq!(f.metrics.snapshot().evictions, 1);
        assert!(!f.cache.contains("b").await);

        // Hide the durable copy so only memory answers
        f.store.set_available(false);
        assert!(f.cache.get("b").await.is_none());
        assert_eq!(f.cache.get("d").await.as_deref(), Some("4"));
        assert_consistent(&f.cache).await;
    }

    #[tokio::test]
    async fn test_evicted_key_is_read_through() {
        let f = fixture(1, Duration::from_secs(300));

        f.cache.put("a", "1", None).await;
        f.cache.put("b", "2", None).await;
        f.cache.flush().await;
        assert!(!f.cache.contains("a").await);

        // Evicted from memory, still durable
        assert_eq!(f.cache.get("a").await.as_deref(), Some("1"));
        assert!(f.cache.contains("a").await);
        assert_eq!(f.cache.size().await, 1);
    }

    #[tokio::test]
    async fn test_lazy_expiry() {
        let f = fixture(10, Duration::from_secs(300));

        f.cache.put("k", "v", Some(Duration::from_millis(50))).await;
        assert_eq!(f.cache.get("k").await.as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(f.cache.size().await, 1, "expiry is lazy");

        assert!(f.cache.get("k").await.is_none());
        assert_eq!(f.cache.size().await, 0);

        let snapshot = f.metrics.snapshot();
        assert_eq!(snapshot.expired, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.entries, 0);
        assert_consistent(&f.cache).await;
    }

    #[tokio::test]
    async fn test_read_through_repair_serves_from_memory() {
        let f = fixture(10, Duration::from_secs(300));
        f.store
            .put("k", "durable", Utc::now() + TimeDelta::hours(1))
            .await;

        assert_eq!(f.cache.get("k").await.as_deref(), Some("durable"));
        assert_eq!(f.cache.get("k").await.as_deref(), Some("durable"));

        assert_eq!(f.store.lookups(), 1);
        assert_eq!(f.metrics.snapshot().hits, 2);
        assert_eq!(f.cache.size().await, 1);
    }

    #[tokio::test]
    async fn test_repair_keeps_newer_resident_value() {
        let f = fixture(10, Duration::from_secs(300));
        let writes_seen = f.cache.state.lock().await.writes;
        f.cache.put("k", "fresh", None).await;

        let value = f.cache.repair("k", "stale".to_string(), writes_seen).await;

        assert_eq!(value, "fresh");
        assert_eq!(f.cache.get("k").await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_get_after_clear_waits_for_pending_put() {
        let f = fixture(10, Duration::from_secs(300));
        f.store
            .put("k", "v0", Utc::now() + TimeDelta::hours(1))
            .await;

        // The durable write of v1 is still queued when memory is cleared
        f.cache.put("k", "v1", None).await;
        f.cache.clear().await;

        assert_eq!(f.cache.get("k").await.as_deref(), Some("v1"));
        f.cache.flush().await;
        assert_eq!(f.store.row("k").await.unwrap().value, "v1");
        assert_eq!(f.cache.get("k").await.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_get_after_eviction_waits_for_pending_put() {
        let f = fixture(1, Duration::from_secs(300));
        f.store
            .put("a", "old", Utc::now() + TimeDelta::hours(1))
            .await;

        f.cache.put("a", "new", None).await;
        f.cache.put("b", "2", None).await;

        assert_eq!(f.cache.get("a").await.as_deref(), Some("new"));
        f.cache.flush().await;
        assert_eq!(f.store.row("a").await.unwrap().value, "new");
    }

    #[tokio::test]
    async fn test_repair_does_not_rewrite_store() {
        let f = fixture(10, Duration::from_secs(300));
        let expiry = Utc::now() + TimeDelta::minutes(10);
        f.store.put("k", "durable", expiry).await;

        assert_eq!(f.cache.get("k").await.as_deref(), Some("durable"));
        f.cache.flush().await;

        assert_eq!(f.store.row("k").await.unwrap().expiry, expiry);
    }

    #[tokio::test]
    async fn test_repair_skipped_when_put_raced_read() {
        let f = fixture(10, Duration::from_secs(300));
        let writes_seen = f.cache.state.lock().await.writes;
        f.cache.put("other", "x", None).await;

        let value = f.cache.repair("k", "maybe-stale".to_string(), writes_seen).await;

        assert_eq!(value, "maybe-stale");
        assert!(!f.cache.contains("k").await);
    }

    #[tokio::test]
    async fn test_clear_leaves_durable_rows() {
        let f = fixture(10, Duration::from_secs(300));

        f.cache.put("a", "1", None).await;
        f.cache.put("b", "2", None).await;
        f.cache.flush().await;
        f.cache.clear().await;

        assert_eq!(f.cache.size().await, 0);
        assert_eq!(f.cache.memory_estimate().await, 0);
        assert!(!f.cache.contains("a").await);
        assert_eq!(f.store.get("a").await.as_deref(), Some("1"));
        assert_eq!(f.metrics.snapshot().entries, 0);
    }

    #[tokio::test]
    async fn test_store_outage_degrades_to_memory() {
        let f = fixture(10, Duration::from_secs(300));
        f.store.set_available(false);

        f.cache.put("k", "v", None).await;
        f.cache.flush().await;

        assert_eq!(f.cache.get("k").await.as_deref(), Some("v"));
        assert!(f.cache.get("other").await.is_none());
        assert_eq!(f.metrics.snapshot().misses, 1);
    }

    #[tokio::test]
    async fn test_memory_gauge_tracks_entries() {
        let f = fixture(2, Duration::from_secs(300));

        f.cache.put("a", "x".repeat(100), None).await;
        let one = f.cache.memory_estimate().await;
        assert!(one > 100);

        f.cache.put("b", "y".repeat(100), None).await;
        f.cache.put("c", "z".repeat(100), None).await;
        assert_eq!(f.cache.memory_estimate().await, 2 * one);
        assert_eq!(f.metrics.snapshot().memory_bytes, 2 * one as u64);
        assert_consistent(&f.cache).await;
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let f = fixture(0, Duration::from_secs(300));
        assert_eq!(f.cache.capacity(), 1);

        f.cache.put("a", "1", None).await;
        f.cache.put("b", "2", None).await;
        assert_eq!(f.cache.size().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_invariants() {
        let f = fixture(16, Duration::from_secs(300));
        let cache = Arc::new(f.cache);

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..200 {
                    let key = format!("k{}", (worker * 7 + i) % 40);
                    cache.put(key.clone(), format!("w{}-{}", worker, i), None).await;
                    cache.get(&key).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_consistent(&cache).await;
        assert!(cache.size().await <= 16);
    }

    #[tokio::test]
    async fn test_durable_matches_memory_for_same_key() {
        let f = fixture(64, Duration::from_secs(300));
        let cache = Arc::new(f.cache);

        let mut tasks = Vec::new();
        for worker in 0..4 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    cache.put("shared", format!("w{}-{}", worker, i), None).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        cache.flush().await;

        let resident = cache.get("shared").await.unwrap();
        assert_eq!(f.store.row("shared").await.unwrap().value, resident);
    }

    #[tokio::test]
    async fn test_shutdown_drains_writes() {
        let f = fixture(10, Duration::from_secs(300));

        f.cache.put("k", "v", None).await;
        f.cache.shutdown().await;

        assert!(f.store.row("k").await.is_some());
    }
}
