//! In-process cache backend for tests and single-node runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{Cache, CacheError, DEFAULT_TTL, Result};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory cache with per-entry expiry.
///
/// The backend can be switched into an unavailable mode where every call
/// fails, which is how tests exercise the "cache down" paths.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`CacheError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(
                "in-memory cache switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;

        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it so the map does not grow without bound.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        self.check_available()?;

        let expires_at = Instant::now() + ttl.unwrap_or(DEFAULT_TTL);
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        self.check_available()?;

        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        self.check_available()?;

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok((before - entries.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}

/// Matches `text` against a Redis-style glob supporting `*` and `?`.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheExt;

    #[test]
    fn glob_matching() {
        assert!(glob_match("pets:list:*", "pets:list:abc:0"));
        assert!(glob_match("pets:list:*", "pets:list:"));
        assert!(glob_match("a?c", "abc"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(!glob_match("pet:*", "pets:list:1"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[tokio::test]
    async fn set_then_get() {
        let cache = InMemoryCache::new();
        cache.set("k", &vec![1, 2, 3], None).await.unwrap();

        let value: Option<Vec<i32>> = cache.get("k").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = cache.get("other").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let cache = InMemoryCache::new();
        cache
            .set_raw("k", "\"v\"".to_string(), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get_raw("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get_raw("k").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn undecodable_value_is_a_miss() {
        let cache = InMemoryCache::new();
        cache
            .set_raw("k", "not json".to_string(), None)
            .await
            .unwrap();

        let value: Option<Vec<i32>> = cache.get("k").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn invalidate_pattern_counts_removed_keys() {
        let cache = InMemoryCache::new();
        for key in ["pets:list:s1:a", "pets:list:s1:b", "pets:list:s2:a", "pet:s1:p1"] {
            cache.set_raw(key, "1".to_string(), None).await.unwrap();
        }

        let removed = cache.invalidate_pattern("pets:list:s1:*").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len().await, 2);
        assert!(cache.contains("pets:list:s2:a").await);
        assert!(cache.contains("pet:s1:p1").await);
    }

    #[tokio::test]
    async fn delete_ignores_missing_keys() {
        let cache = InMemoryCache::new();
        cache.set_raw("a", "1".to_string(), None).await.unwrap();

        cache
            .delete(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn unavailable_mode_fails_every_call() {
        let cache = InMemoryCache::new();
        cache.set_raw("a", "1".to_string(), None).await.unwrap();
        cache.set_unavailable(true);

        assert!(matches!(
            cache.get_raw("a").await,
            Err(CacheError::Unavailable(_))
        ));
        assert!(cache.set_raw("b", "1".to_string(), None).await.is_err());
        assert!(cache.invalidate_pattern("*").await.is_err());
        assert!(cache.ping().await.is_err());

        cache.set_unavailable(false);
        assert_eq!(cache.get_raw("a").await.unwrap().as_deref(), Some("1"));
    }
}
