//! General-purpose TTL cache
//!
//! [`CacheManager`] sits in front of one [`CacheBackend`]: a single JSON file under the cache
//! directory, or a Redis server when one is configured and reachable. Every failure inside the
//! cache is logged and treated as a miss, so callers can always fall back to recomputing.
//!
//! The file backend rewrites the whole file on each mutation. Two processes sharing one cache
//! directory can lose each other's writes.

mod backend;
mod entry;
mod manager;
mod memo;
mod remote;

pub use backend::{CacheBackend, FileBackend, CACHE_FILE};
pub use entry::{CacheEntry, CacheStats, Clock, KeyHits, StoredValue, SystemClock};
pub use manager::CacheManager;
pub use memo::{MemoKey, MemoKeyBuilder};
pub use remote::RemoteBackend;

#[cfg(test)]
pub(crate) use entry::ManualClock;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding failed: {0}")]
    Binary(#[from] bincode::Error),

    #[error("Invalid binary payload: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
