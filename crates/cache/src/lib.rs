//! Cache-aside layer for the pet store.
//!
//! The cache is never authoritative. Every entry is a copy of something the
//! ledger already committed, entries expire on their own, and any backend
//! failure is reported to the caller so it can fall back to the ledger.
//!
//! Backends implement the string-level [`Cache`] trait; typed access goes
//! through [`CacheExt`], which (de)serializes values as JSON.

pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

pub use error::{CacheError, Result};
pub use memory::InMemoryCache;
pub use redis_cache::RedisCache;

/// Time-to-live applied when a caller does not pass one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Key-value cache with expiry and pattern invalidation.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`. `None` uses [`DEFAULT_TTL`].
    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Removes the given keys. Missing keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<()>;

    /// Removes every key matching a glob pattern and returns how many were removed.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Typed helpers on top of [`Cache`].
#[async_trait]
pub trait CacheExt: Cache {
    /// Reads and decodes a value.
    ///
    /// A value that no longer decodes (for example after a schema change) is
    /// reported as a miss rather than an error.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Encodes and stores a value.
    async fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw, ttl).await
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
