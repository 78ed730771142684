//! In-process durable store.
//!
//! Keeps rows in a `HashMap` with the same wall-clock semantics as
//! [`PgStore`](super::PgStore). Useful for tests and for running the cache
//! without a database. It can also simulate an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::{DurableRow, DurableStore};
use crate::error::{CacheError, Result};

/// `HashMap`-backed [`DurableStore`].
#[derive(Debug)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, DurableRow>>,
    available: AtomicBool,
    lookups: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Toggles a simulated outage. While unavailable every operation fails
    /// the way a lost connection would.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of stored rows, expired ones included.
    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    /// Returns the raw row for `key`, ignoring expiry.
    pub async fn row(&self, key: &str) -> Option<DurableRow> {
        self.rows.lock().await.get(key).cloned()
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, expiry: DateTime<Utc>) -> bool {
        if !self.is_available() {
            error!(key, "Durable store unavailable on put");
            return false;
        }

        let mut rows = self.rows.lock().await;
        rows.entry(key.to_string())
            .and_modify(|row| {
                row.value = value.to_string();
                row.expiry = expiry;
            })
            .or_insert_with(|| DurableRow {
                key: key.to_string(),
                value: value.to_string(),
                expiry,
                created_at: Utc::now(),
            });
        debug!(key, "Persisted cache entry");
        true
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            error!(key, "Durable store unavailable on get");
            return None;
        }

        let now = Utc::now();
        let rows = self.rows.lock().await;
        rows.get(key)
            .filter(|row| row.is_live_at(now))
            .map(|row| row.value.clone())
    }

    async fn cleanup_expired(&self) -> u64 {
        if !self.is_available() {
            error!("Durable store unavailable on cleanup");
            return 0;
        }

        let now = Utc::now();
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, row| row.is_live_at(now));
        (before - rows.len()) as u64
    }

    async fn export(&self) -> Result<Vec<DurableRow>> {
        if !self.is_available() {
            return Err(CacheError::Internal(
                "durable store unavailable".to_string(),
            ));
        }

        let now = Utc::now();
        let rows = self.rows.lock().await;
        let mut live: Vec<DurableRow> = rows
            .values()
            .filter(|row| row.is_live_at(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(live)
    }
}
