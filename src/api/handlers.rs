//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. They translate
//! between JSON and the three cache operations and hold no logic of their own.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::cache::{CacheOptions, DurableCache};
use crate::error::{CacheError, Result};
use crate::metrics::CacheMetrics;
use crate::models::{
    ClearResponse, GetResponse, HealthResponse, PutRequest, PutResponse, StatsResponse,
};
use crate::persistence::{CacheExport, DurableStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<DurableCache>,
    pub metrics: Arc<CacheMetrics>,
    pub store: Arc<dyn DurableStore>,
}

impl AppState {
    /// Builds the cache over `store`. Must run inside a tokio runtime.
    pub fn new(store: Arc<dyn DurableStore>, options: CacheOptions) -> Self {
        let metrics = Arc::new(CacheMetrics::new());
        let cache = DurableCache::new(store.clone(), metrics.clone(), options);
        Self {
            cache: Arc::new(cache),
            metrics,
            store,
        }
    }
}

/// Handler for POST /api/cached
///
/// Stores a key-value pair with optional TTL in seconds.
pub async fn put_handler(
    State(state): State<AppState>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl
        .filter(|secs| *secs > 0)
        .unwrap_or_else(|| state.cache.default_ttl().as_secs());

    debug!(key = %req.key, ttl, "PUT");
    let requested_ttl = req.ttl();
    state.cache.put(req.key.clone(), req.value, requested_ttl).await;

    Ok(Json(PutResponse::new(req.key, ttl)))
}

/// Handler for GET /api/cached/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for POST /api/cache/clear
///
/// Empties memory only; durable rows stay.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::cleared())
}

/// Handler for GET /api/cache/export
///
/// Dumps every live durable row.
pub async fn export_handler(State(state): State<AppState>) -> Result<Json<CacheExport>> {
    let rows = state.store.export().await?;
    Ok(Json(CacheExport::new(rows)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.metrics.snapshot()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
