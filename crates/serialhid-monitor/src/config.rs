use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Consecutive channel-loss faults tolerated before the loop gives up.
pub const DEFAULT_MAX_CHANNEL_LOSSES: u32 = 3;

/// Monitor loop behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Stop after this many channel-loss faults in a row. Zero behaves as one.
    pub max_channel_losses: u32,
    /// Sleep this long after an iteration in which neither entity moved any
    /// data. `None` polls without pausing.
    pub idle_backoff_ms: Option<u64>,
}

impl MonitorConfig {
    pub fn idle_backoff(&self) -> Option<Duration> {
        self.idle_backoff_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub(crate) fn loss_limit(&self) -> u32 {
        self.max_channel_losses.max(1)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_channel_losses: DEFAULT_MAX_CHANNEL_LOSSES,
            idle_backoff_ms: Some(1),
        }
    }
}
