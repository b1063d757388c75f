use moka::Expiry;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{with_timeout, AppResult};

const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Aggregated TMDB search for a title and optional year
    TmdbSearch { title: String, year: Option<u16> },
    /// Single catalog entry by id
    MovieDetails(i64),
    /// Watchlist snapshot by Telegram id
    UserWatchlist(i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TmdbSearch { title, year } => match year {
                Some(year) => write!(f, "tmdb:search:{}:{:04}", title.to_lowercase(), year),
                None => write!(f, "tmdb:search:{}:any", title.to_lowercase()),
            },
            CacheKey::MovieDetails(id) => write!(f, "movie:details:{}", id),
            CacheKey::UserWatchlist(telegram_id) => write!(f, "user:watchlist:{}", telegram_id),
        }
    }
}

/// Raw string storage behind [`Cache`]
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_raw(&self, key: String, value: String, ttl: u64) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Typed JSON cache shared by search results, catalog lookups and watchlist snapshots
///
/// Backend failures never reach the caller: a failed read is a miss, a failed
/// write or delete is logged and dropped.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    timeout: Duration,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Cache backed by an in-process [`MemoryCache`]
    pub fn in_memory(max_capacity: u64) -> Self {
        Self::new(
            Arc::new(MemoryCache::new(max_capacity)),
            DEFAULT_CACHE_TIMEOUT,
        )
    }

    /// Retrieves and deserializes a value, or `None` on miss or failure
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();
        let raw = match with_timeout(self.timeout, "cache read", self.backend.get_raw(&key)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, backend = self.backend.name(), "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache deserialization error, treating as miss");
                None
            }
        }
    }

    /// Serializes and stores a value with a TTL in seconds
    pub async fn set_in_cache<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let key = key.to_string();
        if let Err(e) = with_timeout(
            self.timeout,
            "cache write",
            self.backend.set_raw(key.clone(), json, ttl),
        )
        .await
        {
            tracing::warn!(error = %e, key = %key, backend = self.backend.name(), "Cache write failed");
        }
    }

    /// Removes a key so the next read goes to the source
    pub async fn invalidate(&self, key: &CacheKey) {
        let key = key.to_string();
        if let Err(e) = with_timeout(self.timeout, "cache delete", self.backend.delete(&key)).await {
            tracing::warn!(error = %e, key = %key, backend = self.backend.name(), "Cache invalidation failed");
        }
    }
}

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, MemoryEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process bounded cache honouring per-entry TTLs
pub struct MemoryCache {
    entries: moka::future::Cache<String, MemoryEntry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: moka::future::Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set_raw(&self, key: String, value: String, ttl: u64) -> AppResult<()> {
        let entry = MemoryEntry {
            value,
            ttl: Duration::from_secs(ttl),
        };
        self.entries.insert(key, entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    struct UnreachableBackend;

    #[async_trait::async_trait]
    impl CacheBackend for UnreachableBackend {
        async fn get_raw(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::Internal("connection refused".to_string()))
        }

        async fn set_raw(&self, _key: String, _value: String, _ttl: u64) -> AppResult<()> {
            Err(AppError::Internal("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> AppResult<()> {
            Err(AppError::Internal("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    /// Never answers
    struct HangingBackend;

    #[async_trait::async_trait]
    impl CacheBackend for HangingBackend {
        async fn get_raw(&self, _key: &str) -> AppResult<Option<String>> {
            std::future::pending().await
        }

        async fn set_raw(&self, _key: String, _value: String, _ttl: u64) -> AppResult<()> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> AppResult<()> {
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    /// Memory backend whose writes take a while to apply
    struct SlowWriteBackend {
        inner: MemoryCache,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl CacheBackend for SlowWriteBackend {
        async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
            self.inner.get_raw(key).await
        }

        async fn set_raw(&self, key: String, value: String, ttl: u64) -> AppResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.set_raw(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.inner.delete(key).await
        }

        fn name(&self) -> &'static str {
            "slow-write"
        }
    }

    #[test]
    fn test_cache_key_display_search_with_year() {
        let key = CacheKey::TmdbSearch {
            title: "Dune".to_string(),
            year: Some(2021),
        };
        assert_eq!(format!("{}", key), "tmdb:search:dune:2021");
    }

    #[test]
    fn test_cache_key_display_search_pads_year() {
        let key = CacheKey::TmdbSearch {
            title: "Ben-Hur".to_string(),
            year: Some(999),
        };
        assert_eq!(format!("{}", key), "tmdb:search:ben-hur:0999");
    }

    #[test]
    fn test_cache_key_display_search_any_year() {
        let key = CacheKey::TmdbSearch {
            title: "THE MATRIX".to_string(),
            year: None,
        };
        assert_eq!(format!("{}", key), "tmdb:search:the matrix:any");
    }

    #[test]
    fn test_cache_key_display_movie_details() {
        assert_eq!(format!("{}", CacheKey::MovieDetails(42)), "movie:details:42");
    }

    #[test]
    fn test_cache_key_display_user_watchlist() {
        assert_eq!(
            format!("{}", CacheKey::UserWatchlist(123456789)),
            "user:watchlist:123456789"
        );
    }

    #[tokio::test]
    async fn test_memory_cache_roundtrip_and_invalidate() {
        let cache = Cache::in_memory(100);
        let key = CacheKey::UserWatchlist(1);

        cache.set_in_cache(&key, &vec!["a".to_string()], 60).await;
        let cached: Option<Vec<String>> = cache.get_from_cache(&key).await;
        assert_eq!(cached, Some(vec!["a".to_string()]));

        cache.invalidate(&key).await;
        let cached: Option<Vec<String>> = cache.get_from_cache(&key).await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_memory_cache_entry_expires() {
        let cache = Cache::in_memory(100);
        let key = CacheKey::MovieDetails(7);

        cache.set_in_cache(&key, &"short lived", 0).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cached: Option<String> = cache.get_from_cache(&key).await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let cache = Cache::in_memory(100);
        let key = CacheKey::MovieDetails(9);

        cache.set_in_cache(&key, &"not a number", 60).await;
        let cached: Option<u32> = cache.get_from_cache(&key).await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_backend_failure_is_absorbed() {
        let cache = Cache::new(Arc::new(UnreachableBackend), Duration::from_secs(1));
        let key = CacheKey::UserWatchlist(5);

        cache.set_in_cache(&key, &vec![1, 2, 3], 60).await;
        cache.invalidate(&key).await;
        let cached: Option<Vec<i32>> = cache.get_from_cache(&key).await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_hanging_backend_is_cut_off_by_timeout() {
        let cache = Cache::new(Arc::new(HangingBackend), Duration::from_millis(50));
        let key = CacheKey::UserWatchlist(5);

        let finished = tokio::time::timeout(Duration::from_secs(2), async {
            cache.set_in_cache(&key, &vec![1, 2, 3], 60).await;
            cache.invalidate(&key).await;
            cache.get_from_cache::<Vec<i32>>(&key).await
        })
        .await;

        assert_eq!(finished.ok(), Some(None));
    }

    #[tokio::test]
    async fn test_slow_write_completes_before_later_invalidate() {
        let backend = SlowWriteBackend {
            inner: MemoryCache::new(100),
            delay: Duration::from_millis(30),
        };
        let cache = Cache::new(Arc::new(backend), Duration::from_secs(1));
        let key = CacheKey::UserWatchlist(8);

        cache.set_in_cache(&key, &vec!["stale".to_string()], 60).await;
        cache.invalidate(&key).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        let cached: Option<Vec<String>> = cache.get_from_cache(&key).await;
        assert_eq!(cached, None);
    }
}
