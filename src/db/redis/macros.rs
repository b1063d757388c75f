/// Read-through caching around an async computation.
///
/// Returns the cached value when present. Otherwise awaits `$block`, stores an
/// `Ok` result under `$key` for `$ttl` seconds, and returns it. Errors from the
/// block are returned as-is and never cached.
///
/// # Arguments
/// * `$cache`: a [`crate::db::Cache`].
/// * `$key`: the [`crate::db::CacheKey`] to read and populate.
/// * `$ttl`: the time-to-live of the stored value, in seconds.
/// * `$block`: a future yielding `AppResult<T>`.
///
/// # Example
/// ```rust,ignore
/// let movie: AppResult<Movie> = cached!(self.cache, CacheKey::MovieDetails(id), 600, async {
///     load_movie(id).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await {
            Ok(cached)
        } else {
            let computed: $crate::error::AppResult<_> = $block.await;
            match computed {
                Ok(value) => {
                    $cache.set_in_cache(&key, &value, $ttl).await;
                    Ok(value)
                }
                Err(e) => Err(e),
            }
        }
    }};
}
