//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the cache.
//!
//! # Tasks
//! - Janitor: sweeps expired rows out of the durable store at a fixed interval

mod janitor;

pub use janitor::Janitor;
