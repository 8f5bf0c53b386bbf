//! Shared read-through and invalidation helpers.

use std::future::Future;

use finsync_cache::{CacheKey, Ttl, TtlCache};
use finsync_types::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// Return the cached value under `key`, or fetch it and cache the result.
///
/// Fetch errors propagate unchanged and are never cached.
pub(crate) async fn read_through<T, F, Fut>(
    cache: &TtlCache,
    key: &CacheKey,
    ttl: Ttl,
    fetch: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(hit) = cache.get::<T>(key).await {
        trace!(key = %key, "Serving from cache");
        return Ok(hit);
    }

    let value = fetch().await?;
    cache.set(key, &value, ttl).await;
    Ok(value)
}

/// Drop every record-derived entry owned by `user_id`.
pub(crate) async fn invalidate_user_records(cache: &TtlCache, user_id: &str) -> usize {
    let removed = cache
        .invalidate_prefixes(&CacheKey::user_record_prefixes(user_id))
        .await;
    debug!(user_id = %user_id, removed, "Invalidated record caches");
    removed
}
