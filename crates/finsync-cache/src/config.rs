//! Configuration for the TTL cache.

use std::time::Duration;

use crate::ttl::TtlTiers;

/// Default storage key prefix for cache entries.
pub const DEFAULT_NAMESPACE: &str = "@finsync_cache:";

/// Configuration for the TTL cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix prepended to every storage key owned by the cache.
    ///
    /// Keys outside the prefix are never read, swept or cleared, so the cache
    /// can share a storage backend with other data.
    pub namespace: String,

    /// Durations for the named TTL tiers.
    pub tiers: TtlTiers,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            tiers: TtlTiers::default(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage key prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Replace all TTL tiers.
    pub fn with_tiers(mut self, tiers: TtlTiers) -> Self {
        self.tiers = tiers;
        self
    }

    /// Set the medium tier used for lists and dashboards.
    pub fn with_medium_ttl(mut self, ttl: Duration) -> Self {
        self.tiers.medium = ttl;
        self
    }
}
