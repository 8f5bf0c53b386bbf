//! Generic local key/value storage.
//!
//! This module decouples the TTL cache from where bytes actually live. The
//! [`StorageBackend`] trait mirrors a flat string store: the cache keeps
//! every entry under a namespace prefix and discovers its own keys by
//! listing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, StorageError};

/// Trait for local storage backends.
///
/// Keys and values are opaque strings. Implementations must make a single
/// `set_item` atomic so a concurrent reader sees either the old or the new
/// value.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Every key currently stored.
    async fn keys(&self) -> Result<Vec<String>>;

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push((key.clone(), self.get_item(key).await?));
        }
        Ok(out)
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.remove_item(key).await?;
        }
        Ok(())
    }
}

/// Shared storage handle.
pub type SharedStorage = Arc<dyn StorageBackend>;

// ============================================================================
// MemoryStorage
// ============================================================================

/// Process-local storage. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<BTreeMap<String, String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Store a raw value directly, bypassing the cache encoding.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items.lock().insert(key.into(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Backend("memory storage unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.check()?;
        self.items.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.items.lock().keys().cloned().collect())
    }
}

// ============================================================================
// FileStorage
// ============================================================================

/// One file per key inside a directory.
///
/// File names are the URL-safe base64 encoding of the key, so any key maps to
/// a valid file name and listing the directory recovers the keys. Writes go to
/// a temporary file that is renamed into place.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    write_seq: AtomicU64,
}

impl FileStorage {
    /// Use `dir` as the storage root. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(URL_SAFE_NO_PAD.encode(key))
    }

    fn key_for(file_name: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(file_name).ok()?;
        String::from_utf8(bytes).ok()
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.path_for(key);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        // '.' is outside the base64 alphabet, so temp files never list as keys.
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", std::process::id(), seq));

        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        trace!(path = %target.display(), bytes = value.len(), "Wrote storage item");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(key) = entry.file_name().to_str().and_then(Self::key_for) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
