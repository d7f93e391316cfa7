use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the batch engine and its progress fan-out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pause between items so a long batch does not starve the scheduler.
    /// Zero disables pacing.
    pub pacing_delay_ms: u64,
    /// Capacity of the per-run progress channel.
    pub channel_capacity: usize,
    /// Capacity of each hub subscriber's broadcast buffer.
    pub hub_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: 10,
            channel_capacity: 1024,
            hub_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Configuration without pacing, for tests and scripted runs.
    pub fn unpaced() -> Self {
        Self {
            pacing_delay_ms: 0,
            ..Default::default()
        }
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}
