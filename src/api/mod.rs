//! API Module
//!
//! HTTP handlers and routing for the cache server.
//!
//! # Endpoints
//! - `POST /api/cached` - Store a key-value pair
//! - `GET /api/cached/:key` - Retrieve a value by key
//! - `POST /api/cache/clear` - Empty the in-memory cache
//! - `GET /api/cache/export` - Dump live durable rows
//! - `GET /stats` - Get cache metrics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
