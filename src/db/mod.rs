pub mod cache;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use cache::{Cache, CacheBackend, CacheKey, MemoryCache};
pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use self::redis::{create_redis_client, RedisCache};
pub use store::WatchlistStore;
