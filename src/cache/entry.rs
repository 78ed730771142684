//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::mem::size_of;
use std::time::{Duration, Instant};

/// Roughly one century; used when `now + ttl` overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Fixed bookkeeping per resident entry, including the key copies held by
/// the map and the recency tracker.
const ENTRY_OVERHEAD: usize =
    size_of::<CacheEntry>() + 3 * size_of::<String>() + 2 * size_of::<u64>();

// == Cache Entry ==
/// Represents a single in-memory cache entry.
///
/// The deadline is measured on the monotonic clock, so it is immune to
/// wall-clock adjustments but meaningless across restarts. Entries are
/// replaced on re-`put`, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Monotonic deadline after which the entry is stale
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry living for `ttl` from now.
    pub fn new(value: String, ttl: Duration) -> Self {
        Self::starting_at(value, ttl, Instant::now())
    }

    fn starting_at(value: String, ttl: Duration, now: Instant) -> Self {
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self { value, expires_at }
    }

    // == Freshness ==
    /// An entry is fresh while `now <= expires_at`.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now <= self.expires_at
    }

    #[cfg(test)]
    pub fn is_expired(&self) -> bool {
        !self.is_fresh_at(Instant::now())
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    #[cfg(test)]
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    // == Footprint ==
    /// Estimated bytes this entry costs while resident under `key`.
    pub fn footprint(&self, key: &str) -> usize {
        3 * key.len() + self.value.len() + ENTRY_OVERHEAD
    }
}
