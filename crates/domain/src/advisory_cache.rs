//! Best-effort cache access shared by the services.
//!
//! Nothing here returns an error: a failing cache is logged, counted in
//! `cache_errors_total` and otherwise treated as a miss.

use std::time::Duration;

use cache::{Cache, CacheError, CacheExt};
use serde::{Serialize, de::DeserializeOwned};

fn record_failure(op: &'static str, target: &str, err: &CacheError) {
    tracing::warn!(op, target, error = %err, "Cache operation failed");
    metrics::counter!("cache_errors_total", "op" => op).increment(1);
}

pub(crate) async fn read<T>(cache: &dyn Cache, key: &str) -> Option<T>
where
    T: DeserializeOwned + Send,
{
    let result: cache::Result<Option<T>> = cache.get(key).await;
    match result {
        Ok(hit) => {
            let outcome = if hit.is_some() { "hit" } else { "miss" };
            metrics::counter!("cache_lookups_total", "outcome" => outcome).increment(1);
            hit
        }
        Err(e) => {
            record_failure("get", key, &e);
            None
        }
    }
}

pub(crate) async fn write<T>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration)
where
    T: Serialize + Sync,
{
    if let Err(e) = cache.set(key, value, Some(ttl)).await {
        record_failure("set", key, &e);
    }
}

pub(crate) async fn evict(cache: &dyn Cache, keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    if let Err(e) = cache.delete(keys).await {
        record_failure("delete", &keys.join(","), &e);
    }
}

pub(crate) async fn evict_pattern(cache: &dyn Cache, pattern: &str) {
    match cache.invalidate_pattern(pattern).await {
        Ok(removed) => tracing::debug!(pattern, removed, "Invalidated cached listings"),
        Err(e) => record_failure("invalidate_pattern", pattern, &e),
    }
}
