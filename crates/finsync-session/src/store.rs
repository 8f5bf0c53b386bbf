//! Typed credential store over a [`SecretBackend`].

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::error::SecretError;
use crate::secrets::{MemorySecretBackend, SecretBackend, SecretName, SharedSecretBackend};

/// Credential store shared by the session layer.
///
/// Reads never fail: backend errors are logged and reported as absent.
/// Writes return the backend error so callers can abort.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    backend: SharedSecretBackend,
}

impl CredentialStore {
    pub fn new(backend: SharedSecretBackend) -> Self {
        Self { backend }
    }

    /// Store backed by a fresh [`MemorySecretBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySecretBackend::new()))
    }

    pub async fn get_secret(&self, name: SecretName) -> Option<String> {
        match self.backend.get(name).await {
            Ok(value) => value,
            Err(e) => {
                warn!(secret = %name, error = %e, "Failed to read secret");
                None
            }
        }
    }

    pub async fn set_secret(&self, name: SecretName, value: &str) -> Result<(), SecretError> {
        self.backend.set(name, value).await.map_err(|e| {
            warn!(secret = %name, error = %e, "Failed to store secret");
            e
        })
    }

    pub async fn remove_secret(&self, name: SecretName) -> Result<(), SecretError> {
        self.backend.delete(name).await.map_err(|e| {
            warn!(secret = %name, error = %e, "Failed to remove secret");
            e
        })
    }

    pub async fn token(&self) -> Option<String> {
        self.get_secret(SecretName::AuthToken).await
    }

    pub async fn set_token(&self, token: &str) -> Result<(), SecretError> {
        self.set_secret(SecretName::AuthToken, token).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.get_secret(SecretName::RefreshToken).await
    }

    pub async fn set_refresh_token(&self, token: &str) -> Result<(), SecretError> {
        self.set_secret(SecretName::RefreshToken, token).await
    }

    pub async fn user_id(&self) -> Option<String> {
        self.get_secret(SecretName::UserId).await
    }

    pub async fn set_user_id(&self, user_id: &str) -> Result<(), SecretError> {
        self.set_secret(SecretName::UserId, user_id).await
    }

    /// Stored session expiry; unparseable values read as absent.
    pub async fn session_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.get_secret(SecretName::SessionExpiry).await?;
        match raw.trim().parse::<i64>() {
            Ok(ms) => Utc.timestamp_millis_opt(ms).single(),
            Err(_) => {
                warn!(value = %raw, "Ignoring malformed session expiry");
                None
            }
        }
    }

    pub async fn set_session_expiry(&self, expires_at: DateTime<Utc>) -> Result<(), SecretError> {
        self.set_secret(
            SecretName::SessionExpiry,
            &expires_at.timestamp_millis().to_string(),
        )
        .await
    }

    /// True iff an expiry is stored and `now` is strictly before it.
    pub async fn is_session_valid(&self, now: DateTime<Utc>) -> bool {
        self.session_expiry().await.is_some_and(|expiry| now < expiry)
    }

    /// Remove every stored credential, best effort.
    pub async fn clear_auth_data(&self) {
        for name in SecretName::ALL {
            if let Err(e) = self.backend.delete(name).await {
                warn!(secret = %name, error = %e, "Failed to clear secret");
            }
        }
        debug!("Cleared stored credentials");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn setup() -> (CredentialStore, MemorySecretBackend) {
        let backend = MemorySecretBackend::new();
        (CredentialStore::new(Arc::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn test_read_failure_is_absent() {
        let (store, backend) = setup();
        store.set_token("t").await.unwrap();
        backend.set_fail_reads(true);
        assert_eq!(store.token().await, None);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let (store, backend) = setup();
        backend.set_fail_writes(true);
        assert!(store.set_user_id("u1").await.is_err());
        assert!(store.remove_secret(SecretName::UserId).await.is_err());
    }

    #[tokio::test]
    async fn test_session_expiry_encoding() {
        let (store, backend) = setup();
        let expiry = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        store.set_session_expiry(expiry).await.unwrap();

        assert_eq!(
            backend.peek(SecretName::SessionExpiry),
            Some(expiry.timestamp_millis().to_string())
        );
        assert_eq!(store.session_expiry().await, Some(expiry));
        assert!(store.is_session_valid(expiry - Duration::milliseconds(1)).await);
        assert!(!store.is_session_valid(expiry).await);
    }

    #[tokio::test]
    async fn test_malformed_expiry_is_invalid() {
        let (store, backend) = setup();
        backend.set(SecretName::SessionExpiry, "tomorrow").await.unwrap();
        assert_eq!(store.session_expiry().await, None);
        assert!(!store.is_session_valid(Utc::now()).await);
    }

    #[tokio::test]
    async fn test_clear_auth_data_removes_everything() {
        let (store, backend) = setup();
        store.set_token("t").await.unwrap();
        store.set_refresh_token("r").await.unwrap();
        store.set_user_id("u1").await.unwrap();
        store.set_session_expiry(Utc::now()).await.unwrap();

        store.clear_auth_data().await;
        assert!(backend.is_empty());
    }
}
