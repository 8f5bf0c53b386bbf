//! CLI command handlers.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod records;
pub mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use finsync_cache::{CacheConfig, FileStorage, TtlCache, TtlTiers};
use finsync_config::{FinsyncConfig, LoadedConfig};
use finsync_reactive::StreamConfig;
use finsync_session::{CredentialStore, KeyringBackend, SessionConfig};
use finsync_types::Record;

/// Fallback cache location when no platform data dir exists.
const FALLBACK_CACHE_DIR: &str = ".finsync-cache";

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Merged configuration and the files it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    pub fn config(&self) -> &FinsyncConfig {
        &self.loaded.config
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.config()
            .cache()
            .dir
            .or_else(finsync_config::default_cache_dir)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_CACHE_DIR))
    }

    pub fn cache_config(&self) -> CacheConfig {
        let section = self.config().cache();
        let tiers = TtlTiers::default()
            .with_short(section.ttl.short())
            .with_medium(section.ttl.medium())
            .with_long(section.ttl.long())
            .with_very_long(section.ttl.very_long());
        CacheConfig::new()
            .with_namespace(section.namespace)
            .with_tiers(tiers)
    }

    /// File-backed cache under [`cache_dir`](Self::cache_dir).
    pub fn open_cache(&self) -> TtlCache {
        TtlCache::new(
            Arc::new(FileStorage::new(self.cache_dir())),
            self.cache_config(),
        )
    }

    pub fn session_config(&self) -> SessionConfig {
        let section = self.config().session();
        SessionConfig::new()
            .with_duration(section.duration())
            .with_renewal_interval(section.renewal_interval())
            .with_keyring_service(section.keyring_service)
    }

    /// Runtime settings for live record pipelines from `[stream]`.
    pub fn stream_config(&self) -> StreamConfig {
        let section = self.config().stream();
        StreamConfig::new()
            .with_search_debounce(section.search_debounce())
            .with_buffer_size(section.buffer_size)
    }

    /// Credential store over the platform keyring.
    pub fn credential_store(&self) -> CredentialStore {
        let service = self.session_config().keyring_service;
        CredentialStore::new(Arc::new(KeyringBackend::new(service)))
    }
}

/// Read a JSON array of records exported from the remote store.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))
}

/// Render a duration as whole seconds, minutes or hours.
pub fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
