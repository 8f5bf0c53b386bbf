//! TTL key-value cache for finsync.
//!
//! This crate provides a best-effort local cache of remote query results:
//! - Per-entry expiration with named TTL tiers
//! - User-scoped [`CacheKey`]s with prefix invalidation
//! - Pluggable [`StorageBackend`]s (in-memory and file-backed)
//!
//! # Example
//!
//! ```rust,ignore
//! use finsync_cache::{CacheConfig, CacheKey, FileStorage, Ttl, TtlCache};
//!
//! let cache = TtlCache::new(Arc::new(FileStorage::new(dir)), CacheConfig::default());
//! cache.initialize().await;
//!
//! cache.set(&CacheKey::transaction_categories("u1"), &categories, Ttl::LONG).await;
//! let hit: Option<Vec<String>> = cache.get(&CacheKey::transaction_categories("u1")).await;
//! ```

mod cache;
mod config;
mod entry;
mod error;
mod keys;
mod storage;
mod ttl;

pub use cache::{CacheInfo, TtlCache};
pub use config::{CacheConfig, DEFAULT_NAMESPACE};
pub use entry::CacheEntry;
pub use error::{Result, StorageError};
pub use keys::{CacheKey, Namespace};
pub use storage::{FileStorage, MemoryStorage, SharedStorage, StorageBackend};
pub use ttl::{Ttl, TtlTiers};
