//! Error types shared by the remote collaborators.

/// Failure reported by the remote record store or one of its channels.
///
/// `Clone` so a single subscription failure can be fanned out to every
/// listener of a user's snapshot channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Requested document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to access the document.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The live-update channel failed.
    #[error("Subscription error: {0}")]
    Subscription(String),
}

/// Failure reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Credentials rejected.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No user is currently signed in.
    #[error("No signed-in user")]
    NoIdentity,

    /// Provider could not be reached or failed internally.
    #[error("Auth provider error: {0}")]
    Provider(String),
}

/// Invalid reporting window key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("Invalid window key '{key}' for period {period}")]
    InvalidKey { period: String, key: String },
}

/// Result type for remote collaborator operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
