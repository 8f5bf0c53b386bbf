//! Configuration for the session manager.

use std::time::Duration;

/// Default session lifetime after initialization or renewal.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default renewal period. Provider tokens live about an hour.
pub const DEFAULT_RENEWAL_INTERVAL: Duration = Duration::from_secs(50 * 60);

/// Shortest renewal period accepted; smaller values are raised to it.
pub const MIN_RENEWAL_INTERVAL: Duration = Duration::from_secs(1);

/// Default keyring service name.
pub const DEFAULT_KEYRING_SERVICE: &str = "finsync";

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a session stays valid after it is created or renewed.
    pub duration: Duration,

    /// Period of the background token renewal. Never below
    /// [`MIN_RENEWAL_INTERVAL`] when the timer runs.
    pub renewal_interval: Duration,

    /// Service name for keyring entries.
    pub keyring_service: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_SESSION_DURATION,
            renewal_interval: DEFAULT_RENEWAL_INTERVAL,
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_renewal_interval(mut self, interval: Duration) -> Self {
        self.renewal_interval = interval.max(MIN_RENEWAL_INTERVAL);
        self
    }

    pub fn with_keyring_service(mut self, service: impl Into<String>) -> Self {
        self.keyring_service = service.into();
        self
    }
}
