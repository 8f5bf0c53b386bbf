//! Stream tuning.

use std::time::Duration;

/// Default quiet period before a search term is applied.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Default per-subscription item buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Configuration for record and dashboard streams.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Quiet period a search term must survive before it is queried.
    pub search_debounce: Duration,
    /// Items buffered between a subscription's driver and its consumer.
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }

    /// Set the buffer size; zero is raised to one.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }
}
