//! Persistence Module
//!
//! Durable backing store consulted on cache misses and updated on every write.
//!
//! Durable freshness is judged on wall-clock time (`chrono::Utc`), unlike the
//! in-memory cache which uses a monotonic clock. A row written with
//! `expiry = now + ttl` survives a process restart but is exposed to clock
//! adjustments.

mod memory;
mod postgres;
mod writer;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::error::Result;

pub use memory::MemoryStore;
pub use postgres::{PgStore, CONNECT_ATTEMPTS};
pub use writer::DurableWriter;

// == Durable Store ==
/// Backing store for cache entries.
///
/// Only `export` reports errors. The other operations log connectivity and
/// query failures and collapse them into an empty result.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Upserts `key`, overwriting value and expiry on conflict.
    async fn put(&self, key: &str, value: &str, expiry: DateTime<Utc>) -> bool;

    /// Returns the value if a row exists with `expiry > now`.
    async fn get(&self, key: &str) -> Option<String>;

    /// Deletes every row with `expiry <= now`, returning how many were removed.
    async fn cleanup_expired(&self) -> u64;

    /// Lists every non-expired row, ordered by key.
    async fn export(&self) -> Result<Vec<DurableRow>>;
}

// == Durable Row ==
/// One persisted cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DurableRow {
    pub key: String,
    pub value: String,
    pub expiry: DateTime<Utc>,
    /// Set once when the row is first inserted
    pub created_at: DateTime<Utc>,
}

impl DurableRow {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry > now
    }
}

// == Cache Export ==
/// Timestamped dump of the live durable rows.
#[derive(Debug, Clone, Serialize)]
pub struct CacheExport {
    pub timestamp: DateTime<Utc>,
    pub count: usize,
    pub entries: Vec<DurableRow>,
}

impl CacheExport {
    pub fn new(entries: Vec<DurableRow>) -> Self {
        Self {
            timestamp: Utc::now(),
            count: entries.len(),
            entries,
        }
    }
}

/// Computes the wall-clock expiry for a TTL starting now, saturating at the
/// largest representable instant.
pub fn wall_clock_expiry(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
