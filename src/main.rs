use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use watchlist_bot::{
    api::{create_router, AppState},
    config::Config,
    db::{self, Cache, CacheBackend, MemoryCache, PgStore, RedisCache},
    services::{
        conversation::SessionStore, ConversationEngine, SearchAggregator, TmdbClient,
        WatchlistManager,
    },
};

const MAX_TRACKED_USERS: u64 = 10_000;
const STATE_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);
const MEMORY_CACHE_CAPACITY: u64 = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("watchlist_bot=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url, config.storage_timeout()).await?;
    db::run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let cache = build_cache(&config)?;

    let tmdb = TmdbClient::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.http_timeout(),
    )?;
    let search = SearchAggregator::new(
        Arc::new(tmdb),
        cache.clone(),
        config.tmdb_image_base_url.clone(),
    );
    let watchlist = WatchlistManager::new(store, cache, config.storage_timeout());
    let sessions = SessionStore::new(
        MAX_TRACKED_USERS,
        STATE_IDLE_TIMEOUT,
        config.pending_results_ttl(),
    );
    let engine = ConversationEngine::new(sessions, search, watchlist.clone());

    let app = create_router(AppState::new(engine, watchlist, &config.bot_token));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Redis when configured, otherwise the in-process cache
fn build_cache(config: &Config) -> anyhow::Result<Cache> {
    let backend: Arc<dyn CacheBackend> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Using Redis cache");
            Arc::new(RedisCache::new(db::create_redis_client(url)?))
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new(MEMORY_CACHE_CAPACITY))
        }
    };

    Ok(Cache::new(backend, config.cache_timeout()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
