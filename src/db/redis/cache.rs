use redis::AsyncCommands;
use redis::Client;

use crate::db::cache::CacheBackend;
use crate::error::AppResult;

/// Creates a Redis client for caching
///
/// Opening the client does not connect; connections are made per operation,
/// so an unreachable Redis only degrades individual cache calls.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed [`CacheBackend`]
///
/// Every command is awaited in the caller's task, so a write is applied
/// before the call returns and can never land after a later delete. The
/// [`Cache`](crate::db::Cache) facade bounds each call with its timeout.
#[derive(Clone)]
pub struct RedisCache {
    redis_client: Client,
}

impl RedisCache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set_raw(&self, key: String, value: String, ttl: u64) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        // Redis rejects SETEX with a zero expiry.
        let _: () = conn.set_ex(key, value, ttl.max(1)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Cache, CacheKey};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::net::TcpListener;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    /// Accepts connections and holds them open without ever answering
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("redis://{}", addr)
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_write_then_delete_roundtrip() {
        let client = create_redis_client(&redis_url()).unwrap();
        let cache = Cache::new(Arc::new(RedisCache::new(client)), Duration::from_secs(2));

        let key = CacheKey::UserWatchlist(-424242);
        cache.set_in_cache(&key, &vec!["Dune".to_string()], 60).await;

        let cached: Option<Vec<String>> = cache.get_from_cache(&key).await;
        assert_eq!(cached, Some(vec!["Dune".to_string()]));

        cache.invalidate(&key).await;
        let cached: Option<Vec<String>> = cache.get_from_cache(&key).await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_invalidate_after_write_wins() {
        let client = create_redis_client(&redis_url()).unwrap();
        let cache = Cache::new(Arc::new(RedisCache::new(client)), Duration::from_secs(2));

        let key = CacheKey::UserWatchlist(-424243);
        for _ in 0..50 {
            cache.set_in_cache(&key, &vec!["stale".to_string()], 60).await;
        }
        cache.invalidate(&key).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        let cached: Option<Vec<String>> = cache.get_from_cache(&key).await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_reads_as_miss() {
        // Nothing listens on port 1.
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let cache = Cache::new(Arc::new(RedisCache::new(client)), Duration::from_secs(2));

        let cached: Option<String> = cache.get_from_cache(&CacheKey::MovieDetails(1)).await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_unresponsive_redis_is_bounded_by_cache_timeout() {
        let client = create_redis_client(&silent_server().await).unwrap();
        let cache = Cache::new(Arc::new(RedisCache::new(client)), Duration::from_millis(200));
        let key = CacheKey::UserWatchlist(7);

        let started = Instant::now();
        for _ in 0..20 {
            cache.set_in_cache(&key, &vec!["Dune".to_string()], 60).await;
        }
        cache.invalidate(&key).await;
        let cached: Option<Vec<String>> = cache.get_from_cache(&key).await;

        assert_eq!(cached, None);
        // 22 calls, each cut off at 200ms
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
