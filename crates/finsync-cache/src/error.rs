//! Error types for local storage backends.

/// Error type for storage backend operations.
///
/// The cache itself never surfaces these; they are logged and the operation
/// degrades to a miss or a no-op.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend refused or failed the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage backend operations.
pub type Result<T> = std::result::Result<T, StorageError>;
