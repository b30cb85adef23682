//! Cache behavior configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for one credential's cache state.
///
/// Only the first `acquire` for a credential reads these; later acquires
/// with a different config keep the settings already in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds an observation stays fresh after its observation instant.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Maximum number of locations kept; the oldest-inserted is evicted
    /// past this.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Run a background refresher for this credential.
    #[serde(default)]
    pub polling_enabled: bool,

    /// Seconds between background refresh cycles.
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

fn default_ttl_seconds() -> u64 {
    600
}

fn default_history_capacity() -> usize {
    10
}

fn default_poll_interval_seconds() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            history_capacity: default_history_capacity(),
            polling_enabled: false,
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

impl CacheConfig {
    /// The freshness window as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// The background poll period as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}
