// Collector health, published over a watch channel

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorState {
    /// Created, subprocess not launched yet.
    Starting,
    /// Subprocess running and its output is being read.
    Running,
    /// Subprocess exited; waiting out the backoff before a restart.
    Degraded,
    /// Stop requested or restarts exhausted. Rates are stale from here on.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorHealth {
    pub state: CollectorState,
    pub restarts: u32,
}

impl Default for CollectorHealth {
    fn default() -> Self {
        Self {
            state: CollectorState::Starting,
            restarts: 0,
        }
    }
}
