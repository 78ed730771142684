//! Cache Module
//!
//! Provides a bounded in-memory cache with LRU eviction and TTL expiration,
//! fronting a durable store.

mod engine;
mod entry;
mod lru;


// Re-export public types
pub use engine::{CacheOptions, DurableCache};
pub use entry::CacheEntry;
pub use lru::LruTracker;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
