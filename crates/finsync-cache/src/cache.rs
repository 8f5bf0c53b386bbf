//! TTL key-value cache.

use std::sync::Arc;

use finsync_types::{SharedClock, system_clock};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, info, trace, warn};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::keys::CacheKey;
use crate::storage::{MemoryStorage, SharedStorage};
use crate::ttl::{Ttl, TtlTiers};

/// Best-effort cache of serializable values with per-entry expiration.
///
/// Every operation degrades instead of failing: storage errors are logged and
/// reads become misses, writes become no-ops. Expired or undecodable entries
/// are logically absent and are purged when observed. TTL is the only
/// eviction mechanism.
///
/// Clones share the same storage.
#[derive(Debug, Clone)]
pub struct TtlCache {
    storage: SharedStorage,
    clock: SharedClock,
    config: Arc<CacheConfig>,
}

impl TtlCache {
    /// Create a cache over `storage` using the system clock.
    pub fn new(storage: SharedStorage, config: CacheConfig) -> Self {
        Self {
            storage,
            clock: system_clock(),
            config: Arc::new(config),
        }
    }

    /// Cache over fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), CacheConfig::default())
    }

    /// Read time from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn tiers(&self) -> &TtlTiers {
        &self.config.tiers
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.config.namespace, key)
    }

    /// Store `value` under `key`, overwriting any existing entry.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T, ttl: Ttl) {
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        match self
            .storage
            .set_item(&self.storage_key(key.as_str()), &encoded)
            .await
        {
            Ok(()) => trace!(key = %key, bytes = encoded.len(), ttl_ms = ?ttl.as_millis(), "Cache set"),
            Err(e) => warn!(key = %key, error = %e, "Failed to write cache entry"),
        }
    }

    /// Value under `key` if present and still valid.
    ///
    /// An expired entry, or one that does not decode as `T`, is removed and
    /// reported as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let storage_key = self.storage_key(key.as_str());
        let raw = match self.storage.get_item(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                trace!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed cache entry, purging");
                self.purge(&storage_key).await;
                return None;
            }
        };

        if !entry.is_valid_at(self.clock.now()) {
            debug!(key = %key, "Cache entry expired, purging");
            self.purge(&storage_key).await;
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(value) => {
                trace!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache entry has unexpected shape, purging");
                self.purge(&storage_key).await;
                None
            }
        }
    }

    /// Whether a valid entry exists under `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.get::<IgnoredAny>(key).await.is_some()
    }

    pub async fn remove(&self, key: &CacheKey) {
        self.purge(&self.storage_key(key.as_str())).await;
    }

    /// Remove every entry regardless of TTL; returns how many were removed.
    pub async fn clear(&self) -> usize {
        let Some(keys) = self.namespaced_keys().await else {
            return 0;
        };
        let count = keys.len();
        if let Err(e) = self.storage.multi_remove(&keys).await {
            warn!(error = %e, "Failed to clear cache");
            return 0;
        }
        debug!(count, "Cleared cache");
        count
    }

    /// Remove every elapsed or undecodable entry; returns how many were removed.
    pub async fn clear_expired(&self) -> usize {
        let Some(keys) = self.namespaced_keys().await else {
            return 0;
        };
        let items = match self.storage.multi_get(&keys).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to read cache for sweep");
                return 0;
            }
        };

        let now = self.clock.now();
        let expired: Vec<String> = items
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value?;
                let alive = serde_json::from_str::<CacheEntry<IgnoredAny>>(&value)
                    .map(|entry| entry.is_valid_at(now))
                    .unwrap_or(false);
                (!alive).then_some(key)
            })
            .collect();

        if expired.is_empty() {
            return 0;
        }
        if let Err(e) = self.storage.multi_remove(&expired).await {
            warn!(error = %e, "Failed to remove expired cache entries");
            return 0;
        }
        debug!(count = expired.len(), "Swept expired cache entries");
        expired.len()
    }

    /// Remove every entry inside any of `scopes` (see [`CacheKey::in_scope`]).
    ///
    /// Returns how many entries were removed.
    pub async fn invalidate_prefixes(&self, scopes: &[String]) -> usize {
        let Some(keys) = self.namespaced_keys().await else {
            return 0;
        };
        let namespace = self.config.namespace.as_str();
        let doomed: Vec<String> = keys
            .into_iter()
            .filter(|storage_key| {
                let key = &storage_key[namespace.len()..];
                scopes.iter().any(|scope| CacheKey::in_scope(key, scope))
            })
            .collect();

        if doomed.is_empty() {
            return 0;
        }
        if let Err(e) = self.storage.multi_remove(&doomed).await {
            warn!(error = %e, "Failed to invalidate cache scopes");
            return 0;
        }
        debug!(count = doomed.len(), scopes = ?scopes, "Invalidated cache scopes");
        doomed.len()
    }

    /// Approximate byte footprint: sum of stored value lengths.
    pub async fn size(&self) -> usize {
        self.info().await.bytes
    }

    /// Entry count and footprint for diagnostics.
    pub async fn info(&self) -> CacheInfo {
        let Some(keys) = self.namespaced_keys().await else {
            return CacheInfo::default();
        };
        let items = match self.storage.multi_get(&keys).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to read cache for size");
                return CacheInfo::default();
            }
        };

        let (entries, bytes) = items
            .iter()
            .filter_map(|(_, value)| value.as_ref())
            .fold((0, 0), |(n, b), v| (n + 1, b + v.len()));
        CacheInfo::new(entries, bytes)
    }

    /// Start-up sweep. Call once when the process starts.
    pub async fn initialize(&self) -> usize {
        let removed = self.clear_expired().await;
        info!(removed, namespace = %self.config.namespace, "Cache initialized");
        removed
    }

    async fn namespaced_keys(&self) -> Option<Vec<String>> {
        match self.storage.keys().await {
            Ok(keys) => Some(
                keys.into_iter()
                    .filter(|k| k.starts_with(&self.config.namespace))
                    .collect(),
            ),
            Err(e) => {
                warn!(error = %e, "Failed to list cache keys");
                None
            }
        }
    }

    async fn purge(&self, storage_key: &str) {
        if let Err(e) = self.storage.remove_item(storage_key).await {
            warn!(key = %storage_key, error = %e, "Failed to remove cache entry");
        }
    }
}

/// Cache footprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheInfo {
    pub entries: usize,
    pub bytes: usize,
    /// `bytes` in MiB, rounded to two decimals.
    pub megabytes: f64,
}

impl CacheInfo {
    fn new(entries: usize, bytes: usize) -> Self {
        let megabytes = (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
        Self {
            entries,
            bytes,
            megabytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use finsync_types::{ManualClock, RecordQuery};
    use std::time::Duration as StdDuration;

    fn setup() -> (TtlCache, MemoryStorage, ManualClock) {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        let cache = TtlCache::new(Arc::new(storage.clone()), CacheConfig::default())
            .with_clock(clock.shared());
        (cache, storage, clock)
    }

    fn key(user: &str) -> CacheKey {
        CacheKey::transaction_categories(user)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (cache, _, _) = setup();
        cache.set(&key("u1"), &vec!["Food", "Rent"], Ttl::MEDIUM).await;
        let got: Option<Vec<String>> = cache.get(&key("u1")).await;
        assert_eq!(got, Some(vec!["Food".to_string(), "Rent".to_string()]));
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let (cache, storage, clock) = setup();
        cache
            .set(&key("u1"), &1u32, Ttl::For(StdDuration::from_secs(1)))
            .await;

        clock.advance(Duration::milliseconds(999));
        assert_eq!(cache.get::<u32>(&key("u1")).await, Some(1));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get::<u32>(&key("u1")).await, None);
        // Expired entries are purged on observation.
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_infinite_never_expires() {
        let (cache, _, clock) = setup();
        cache.set(&key("u1"), "forever", Ttl::Infinite).await;
        clock.advance(Duration::days(3650));
        assert!(cache.contains(&key("u1")).await);
    }

    #[tokio::test]
    async fn test_overwrite_resets_timestamp() {
        let (cache, _, clock) = setup();
        cache.set(&key("u1"), &1u32, Ttl::SHORT).await;
        clock.advance(Duration::seconds(50));
        cache.set(&key("u1"), &2u32, Ttl::SHORT).await;
        clock.advance(Duration::seconds(50));
        assert_eq!(cache.get::<u32>(&key("u1")).await, Some(2));
    }

    #[tokio::test]
    async fn test_malformed_entry_is_purged() {
        let (cache, storage, _) = setup();
        let storage_key = format!("@finsync_cache:{}", key("u1"));
        storage.insert_raw(storage_key.clone(), "{not json");

        assert_eq!(cache.get::<u32>(&key("u1")).await, None);
        assert_eq!(storage.raw(&storage_key), None);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_absent() {
        let (cache, _, _) = setup();
        cache.set(&key("u1"), "text", Ttl::SHORT).await;
        assert_eq!(cache.get::<u32>(&key("u1")).await, None);
        assert!(!cache.contains(&key("u1")).await);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_silently() {
        let (cache, storage, _) = setup();
        storage.set_failing(true);
        cache.set(&key("u1"), &1u32, Ttl::SHORT).await;
        assert_eq!(cache.get::<u32>(&key("u1")).await, None);
        assert_eq!(cache.clear().await, 0);
        assert_eq!(cache.size().await, 0);

        storage.set_failing(false);
        assert_eq!(cache.get::<u32>(&key("u1")).await, None);
    }

    #[tokio::test]
    async fn test_clear_expired_sweeps_only_elapsed_and_garbage() {
        let (cache, storage, clock) = setup();
        cache.set(&key("short"), &1u32, Ttl::SHORT).await;
        cache.set(&key("long"), &2u32, Ttl::LONG).await;
        storage.insert_raw("@finsync_cache:garbage", "???");
        storage.insert_raw("unrelated", "kept");

        clock.advance(Duration::minutes(2));
        assert_eq!(cache.clear_expired().await, 2);
        assert!(cache.contains(&key("long")).await);
        assert_eq!(storage.raw("unrelated").as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_clear_leaves_foreign_keys() {
        let (cache, storage, _) = setup();
        cache.set(&key("a"), &1u32, Ttl::Infinite).await;
        cache.set(&key("b"), &1u32, Ttl::Infinite).await;
        storage.insert_raw("other_app:key", "x");

        assert_eq!(cache.clear().await, 2);
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_prefixes_scoped_to_user() {
        let (cache, _, _) = setup();
        let q = RecordQuery::default();
        cache.set(&CacheKey::transactions("u1", &q), &0u32, Ttl::MEDIUM).await;
        cache.set(&CacheKey::transaction("u1", "r1"), &0u32, Ttl::MEDIUM).await;
        cache.set(&CacheKey::user_profile("u1"), &0u32, Ttl::MEDIUM).await;
        cache.set(&CacheKey::transactions("u10", &q), &0u32, Ttl::MEDIUM).await;

        let removed = cache
            .invalidate_prefixes(&CacheKey::user_record_prefixes("u1"))
            .await;
        assert_eq!(removed, 2);
        assert!(cache.contains(&CacheKey::user_profile("u1")).await);
        assert!(cache.contains(&CacheKey::transactions("u10", &q)).await);
    }

    #[tokio::test]
    async fn test_info_reports_footprint() {
        let (cache, storage, _) = setup();
        cache.set(&key("u1"), &"x".repeat(2048), Ttl::Infinite).await;
        let info = cache.info().await;
        assert_eq!(info.entries, 1);
        let raw = storage.raw(&format!("@finsync_cache:{}", key("u1"))).unwrap();
        assert_eq!(info.bytes, raw.len());
        assert_eq!(info.megabytes, 0.0);

        assert_eq!(CacheInfo::new(1, 1024 * 1024 + 10_000).megabytes, 1.01);
    }

    #[tokio::test]
    async fn test_file_backed_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(crate::storage::FileStorage::new(dir.path()));
        let cache = TtlCache::new(storage.clone(), CacheConfig::default());
        cache.set(&key("u1"), &42u32, Ttl::SHORT).await;

        // A second cache over the same directory sees the entry.
        let reopened = TtlCache::new(storage, CacheConfig::default());
        assert_eq!(reopened.get::<u32>(&key("u1")).await, Some(42));
        assert_eq!(reopened.initialize().await, 0);
    }
}
