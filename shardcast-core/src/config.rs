//! Runtime configuration for the dispatch core.
//!
//! These are validated runtime values. Loading them from a file is the job of
//! the embedding application (see `shardcast-relay`).

use std::time::Duration;

/// Configuration for an [`EventHub`](crate::EventHub).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Number of shard connections feeding the hub. One lane is created per shard.
    ///
    /// Clamped to a minimum of 1.
    pub shard_count: u32,
    /// Log a warning when a single subscriber callback runs longer than this.
    ///
    /// Callbacks are never cancelled; this only affects logging.
    pub slow_handler_threshold: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            shard_count: 1,
            slow_handler_threshold: None,
        }
    }
}

impl DispatchConfig {
    /// Create a config for `shard_count` shards with no slow-handler warning.
    pub fn new(shard_count: u32) -> Self {
        Self {
            shard_count,
            ..Self::default()
        }
    }

    /// Set the slow-handler warning threshold.
    pub fn with_slow_handler_threshold(mut self, threshold: Duration) -> Self {
        self.slow_handler_threshold = Some(threshold);
        self
    }
}
