//! Secure credential storage and session lifecycle for finsync.
//!
//! [`CredentialStore`] keeps the auth token, refresh token, user id and
//! session expiry in a [`SecretBackend`] (the OS keyring in production).
//! [`SessionManager`] owns the session on top of it: initialization,
//! validation against the auth provider, periodic token renewal, and
//! teardown.

mod config;
mod error;
mod manager;
mod secrets;
mod store;

pub use config::{
    DEFAULT_KEYRING_SERVICE, DEFAULT_RENEWAL_INTERVAL, DEFAULT_SESSION_DURATION,
    MIN_RENEWAL_INTERVAL, SessionConfig,
};
pub use error::{Result, SecretError, SessionError};
pub use manager::{Session, SessionManager, SessionState};
pub use secrets::{
    KeyringBackend, MemorySecretBackend, SecretBackend, SecretName, SharedSecretBackend,
};
pub use store::CredentialStore;
