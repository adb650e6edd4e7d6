//! Engine configuration.

use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a pessimistic transaction waits for a row lock before
    /// giving up. Transaction options may override it per transaction.
    pub lock_timeout: Duration,

    /// Number of `(key, version)` entries the block cache holds.
    pub block_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(1),
            block_cache_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default row-lock timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the block cache capacity. Zero is raised to one.
    #[must_use]
    pub const fn block_cache_capacity(mut self, entries: usize) -> Self {
        self.block_cache_capacity = entries;
        self
    }
}
