//! Error types for credential storage and session management.

use finsync_types::AuthError;

/// Failure from a secret backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecretError {
    /// The keystore rejected or failed the operation.
    #[error("Secret backend error: {0}")]
    Backend(String),

    /// No keystore is available in this build or environment.
    #[error("Secret backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a session lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Persisting a credential failed; the operation was aborted.
    #[error("Failed to persist credentials: {0}")]
    Secret(#[from] SecretError),

    /// The auth provider failed.
    #[error("Auth provider failed: {0}")]
    Auth(#[from] AuthError),

    /// The provider reports no signed-in identity.
    #[error("No signed-in identity")]
    NoIdentity,

    /// The provider issued no token.
    #[error("Auth provider returned no token")]
    NoToken,

    /// No valid session; the user must authenticate again.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The session was cleared or replaced while a renewal was in flight.
    #[error("Session changed during renewal")]
    Superseded,
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
