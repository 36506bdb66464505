/// A macro to simplify read-through caching of derived views.
///
/// Checks the cache for the key; on a hit the cached value is returned,
/// on a miss the provided block computes the value, which is stored in
/// the background and returned. When no cache is configured
/// (`$cache` is `None`) the block runs unconditionally.
///
/// # Arguments
/// * `$cache`: An `Option<&Cache>`; the cache must have `get_from_cache`
///   and `set_in_background` methods.
/// * `$key`: The key to use for caching the value.
/// * `$ttl`: The time-to-live (TTL) for the cached value in seconds.
/// * `$block`: The block of code to execute if the value is not found in cache.
///
/// # Example
/// ```ignore
/// let ranked = cached!(cache.as_ref(), cache_key, ttl, async move {
///     rank_candidates().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache {
            Some(cache) => {
                if let Some(cached) = cache.get_from_cache(&$key).await? {
                    Ok(cached)
                } else {
                    let value = $block.await?;
                    cache.set_in_background(&$key, &value, $ttl);
                    Ok(value)
                }
            }
            None => $block.await,
        }
    }};
}
