//! Shared cache interface and the in-process implementation.
//!
//! Plugin-facing cache access goes through [`Cache`]; the host prefixes keys
//! per plugin before they reach any backend, so namespaces cannot collide.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Default expiration when the caller does not provide one.
const DEFAULT_TTL_SECS: u64 = 300;

/// Maximum entries held by the in-process cache.
const MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The key is not present. Not a transport failure.
    #[error("cache key not found")]
    NotFound,

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A shared byte cache with per-entry expiration.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value. Missing keys are [`CacheError::NotFound`].
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Set a value. `ttl = None` uses the backend default.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<(), CacheError>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process cache backed by moka.
pub struct MemoryCache {
    inner: moka::future::Cache<String, CachedValue>,
}

#[derive(Clone)]
struct CachedValue {
    bytes: Vec<u8>,
    expires_at: std::time::Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        let inner = moka::future::Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .expire_after(PerEntryExpiry)
            .build();

        Self { inner }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-entry expiration driven by the TTL recorded at insert time.
struct PerEntryExpiry;

impl moka::Expiry<String, CachedValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(created_at))
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        match self.inner.get(key).await {
            Some(value) if value.expires_at > std::time::Instant::now() => Ok(value.bytes),
            Some(_) => {
                self.inner.invalidate(key).await;
                Err(CacheError::NotFound)
            }
            None => Err(CacheError::NotFound),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let ttl = ttl.unwrap_or(Duration::from_secs(DEFAULT_TTL_SECS));
        let entry = CachedValue {
            bytes: value,
            expires_at: std::time::Instant::now() + ttl,
        };
        self.inner.insert(key.to_string(), entry).await;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.invalidate(key).await;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let cache = MemoryCache::new();
        assert!(matches!(
            cache.get("absent").await,
            Err(CacheError::NotFound)
        ));
    }

    #[tokio::test]
    async fn set_then_get() {
        let cache = MemoryCache::new();
        cache.set("k", b"value".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), b"value");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = MemoryCache::new();
        cache.set("k", b"v".to_vec(), None).await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(matches!(cache.get("k").await, Err(CacheError::NotFound)));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_missing() {
        let cache = MemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(cache.get("k").await, Err(CacheError::NotFound)));
    }
}
