//! Secret backends: the platform keyring and an in-memory store.
//!
//! Keyring entries are stored as service=`<keyring_service>`, user=`<secret name>`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SecretError;

/// The fixed set of secrets the session layer stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretName {
    AuthToken,
    RefreshToken,
    UserId,
    /// Session expiry as epoch milliseconds.
    SessionExpiry,
}

impl SecretName {
    pub const ALL: [SecretName; 4] = [
        SecretName::AuthToken,
        SecretName::RefreshToken,
        SecretName::UserId,
        SecretName::SessionExpiry,
    ];

    /// Entry name in the backing store.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretName::AuthToken => "auth_token",
            SecretName::RefreshToken => "refresh_token",
            SecretName::UserId => "user_id",
            SecretName::SessionExpiry => "session_expiry",
        }
    }
}

impl std::fmt::Display for SecretName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encrypted key/value store for small secrets.
#[async_trait]
pub trait SecretBackend: Send + Sync + std::fmt::Debug {
    async fn get(&self, name: SecretName) -> Result<Option<String>, SecretError>;

    async fn set(&self, name: SecretName, value: &str) -> Result<(), SecretError>;

    /// Delete a secret. Deleting a missing secret is not an error.
    async fn delete(&self, name: SecretName) -> Result<(), SecretError>;
}

pub type SharedSecretBackend = Arc<dyn SecretBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local secret store. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretBackend {
    items: Arc<Mutex<HashMap<SecretName, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemorySecretBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `set` and `delete` fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Peek at a stored value, ignoring injected failures.
    pub fn peek(&self, name: SecretName) -> Option<String> {
        self.items.lock().get(&name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn check(flag: &AtomicBool) -> Result<(), SecretError> {
        if flag.load(Ordering::SeqCst) {
            Err(SecretError::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SecretBackend for MemorySecretBackend {
    async fn get(&self, name: SecretName) -> Result<Option<String>, SecretError> {
        Self::check(&self.fail_reads)?;
        Ok(self.items.lock().get(&name).cloned())
    }

    async fn set(&self, name: SecretName, value: &str) -> Result<(), SecretError> {
        Self::check(&self.fail_writes)?;
        self.items.lock().insert(name, value.to_string());
        Ok(())
    }

    async fn delete(&self, name: SecretName) -> Result<(), SecretError> {
        Self::check(&self.fail_writes)?;
        self.items.lock().remove(&name);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyring backend
// ─────────────────────────────────────────────────────────────────────────────

/// OS keyring (macOS Keychain, Linux secret-service, Windows Credential Manager).
///
/// Keyring calls block, so each one runs on the blocking thread pool. Without
/// the `keyring` feature every operation reports [`SecretError::Unavailable`].
#[derive(Debug, Clone)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl SecretBackend for KeyringBackend {
    async fn get(&self, name: SecretName) -> Result<Option<String>, SecretError> {
        let service = self.service.clone();
        run_blocking(move || keyring_get(&service, name.as_str())).await
    }

    async fn set(&self, name: SecretName, value: &str) -> Result<(), SecretError> {
        let service = self.service.clone();
        let value = value.to_string();
        run_blocking(move || keyring_set(&service, name.as_str(), &value)).await
    }

    async fn delete(&self, name: SecretName) -> Result<(), SecretError> {
        let service = self.service.clone();
        run_blocking(move || keyring_delete(&service, name.as_str())).await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, SecretError>
where
    F: FnOnce() -> Result<T, SecretError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SecretError::Backend(format!("keyring task failed: {}", e)))?
}

#[cfg(feature = "keyring")]
fn keyring_get(service: &str, user: &str) -> Result<Option<String>, SecretError> {
    // Skip keyring access during tests to avoid macOS Keychain prompts
    // and keep tests isolated from local machine state.
    if cfg!(test) {
        return Err(SecretError::Unavailable("keyring access disabled in tests".to_string()));
    }
    let entry = keyring::Entry::new(service, user)
        .map_err(|e| SecretError::Backend(format!("keyring error: {}", e)))?;
    match entry.get_password() {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(SecretError::Backend(format!("failed to read from keyring: {}", e))),
    }
}

#[cfg(feature = "keyring")]
fn keyring_set(service: &str, user: &str, secret: &str) -> Result<(), SecretError> {
    if cfg!(test) {
        return Err(SecretError::Unavailable("keyring access disabled in tests".to_string()));
    }
    let entry = keyring::Entry::new(service, user)
        .map_err(|e| SecretError::Backend(format!("keyring error: {}", e)))?;
    entry
        .set_password(secret)
        .map_err(|e| SecretError::Backend(format!("failed to store in keyring: {}", e)))
}

#[cfg(feature = "keyring")]
fn keyring_delete(service: &str, user: &str) -> Result<(), SecretError> {
    if cfg!(test) {
        return Err(SecretError::Unavailable("keyring access disabled in tests".to_string()));
    }
    let entry = keyring::Entry::new(service, user)
        .map_err(|e| SecretError::Backend(format!("keyring error: {}", e)))?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(SecretError::Backend(format!("failed to delete from keyring: {}", e))),
    }
}

#[cfg(not(feature = "keyring"))]
fn keyring_get(_service: &str, _user: &str) -> Result<Option<String>, SecretError> {
    Err(not_compiled())
}

#[cfg(not(feature = "keyring"))]
fn keyring_set(_service: &str, _user: &str, _secret: &str) -> Result<(), SecretError> {
    Err(not_compiled())
}

#[cfg(not(feature = "keyring"))]
fn keyring_delete(_service: &str, _user: &str) -> Result<(), SecretError> {
    Err(not_compiled())
}

#[cfg(not(feature = "keyring"))]
fn not_compiled() -> SecretError {
    SecretError::Unavailable(
        "keyring support not compiled in (enable the 'keyring' feature)".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_names() {
        let names: Vec<_> = SecretName::ALL.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["auth_token", "refresh_token", "user_id", "session_expiry"]);
    }

    #[tokio::test]
    async fn test_memory_backend_round_trip() {
        let backend = MemorySecretBackend::new();
        backend.set(SecretName::UserId, "u1").await.unwrap();
        assert_eq!(backend.get(SecretName::UserId).await.unwrap().as_deref(), Some("u1"));

        backend.delete(SecretName::UserId).await.unwrap();
        backend.delete(SecretName::UserId).await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_memory_backend_injected_failures() {
        let backend = MemorySecretBackend::new();
        backend.set_fail_writes(true);
        assert!(backend.set(SecretName::AuthToken, "t").await.is_err());
        backend.set_fail_writes(false);

        backend.set(SecretName::AuthToken, "t").await.unwrap();
        backend.set_fail_reads(true);
        assert!(backend.get(SecretName::AuthToken).await.is_err());
        assert_eq!(backend.peek(SecretName::AuthToken).as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_keyring_backend_unavailable_in_tests() {
        let backend = KeyringBackend::new("finsync-test");
        assert!(matches!(
            backend.get(SecretName::AuthToken).await,
            Err(SecretError::Unavailable(_))
        ));
    }
}
