//! Batcher construction parameters

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing configuration for an [`ActionBatcher`](crate::ActionBatcher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Identifier used in the batch log
    pub name: String,

    /// Delay before a staged batch is eligible to flush (default: 0)
    pub interval_ms: u64,

    /// Restart the delay window on every start (default: true)
    ///
    /// When false, a running timer is left alone and later submissions
    /// ride along with it.
    pub require_lull: bool,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            interval_ms: 0,
            require_lull: true,
        }
    }
}

impl BatcherConfig {
    /// Create a configuration with default timing
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_require_lull(mut self, require_lull: bool) -> Self {
        self.require_lull = require_lull;
        self
    }

    /// Flush delay as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
