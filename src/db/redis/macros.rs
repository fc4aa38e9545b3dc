/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$future`, queues the result for a background write with `$ttl` seconds
/// to live, and returns it. Errors from the cache read or from the future
/// propagate with `?`, so the macro must be used inside a function
/// returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// cached!(
///     self.cache,
///     CacheKey::Embedding { model: self.model.clone(), text: text.to_string() },
///     self.cache_ttl,
///     self.call_api(text)
/// )
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $future:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $future.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
