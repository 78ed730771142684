//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.
//!
//! Note that per-operation durable store failures never show up here: the
//! store boundary converts them into `false` / absent results. Only startup
//! failures and the out-of-band export path surface as `CacheError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache server.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in memory or in the durable store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Query against the durable store failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Durable store unreachable after every connection attempt
    #[error("Database connection failed after {attempts} attempts: {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::ConnectionFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Database(_) | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            CacheError::NotFound(_) => "Key not found".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": "error",
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
