//! Error types for finsync streams.

use finsync_types::RemoteError;
use thiserror::Error;

/// Result type for stream items.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Terminal stream failures. A stream that yields one of these ends after it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    #[error("Subscription failed: {0}")]
    Subscription(#[from] RemoteError),
}
