//! Durable Cache - a write-through LRU/TTL cache server
//!
//! Bounded in-memory cache with LRU eviction and per-entry TTL, backed by a
//! PostgreSQL store that is written asynchronously and read on misses.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheOptions, DurableCache};
pub use config::{Config, DatabaseConfig};
pub use error::{CacheError, Result};
pub use metrics::{CacheMetrics, MetricsSink};
pub use persistence::{DurableStore, MemoryStore, PgStore};
