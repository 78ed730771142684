//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::metrics::MetricsSnapshot;

const SUCCESS: &str = "success";

/// Response body for the GET operation (GET /api/cached/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: String,
    pub status: &'static str,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            status: SUCCESS,
        }
    }
}

/// Response body for the PUT operation (POST /api/cached)
#[derive(Debug, Clone, Serialize)]
pub struct PutResponse {
    /// Success message
    pub message: String,
    /// The key that was stored
    pub key: String,
    /// Effective TTL in seconds
    pub ttl: u64,
    pub status: &'static str,
}

impl PutResponse {
    /// Creates a new PutResponse
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        Self {
            message: "Entry cached successfully".to_string(),
            key: key.into(),
            ttl,
            status: SUCCESS,
        }
    }
}

/// Response body for the clear operation (POST /api/cache/clear)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub status: &'static str,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
            status: SUCCESS,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Number of entries found expired on read
    pub expired: u64,
    /// Current number of entries in memory
    pub total_entries: u64,
    /// Estimated memory held by entries, in bytes
    pub memory_bytes: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<MetricsSnapshot> for StatsResponse {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            hits: snapshot.hits,
            misses: snapshot.misses,
            evictions: snapshot.evictions,
            expired: snapshot.expired,
            total_entries: snapshot.entries,
            memory_bytes: snapshot.memory_bytes,
            hit_rate: snapshot.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
