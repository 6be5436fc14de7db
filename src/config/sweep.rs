//! Sweep scheduling configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MIN_INTERVAL_SECS: u64 = 60;
const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// When the cycle activation sweep runs.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Run the scheduler at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Sweep once right after startup
    #[serde(default = "default_enabled")]
    pub run_on_start: bool,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.interval_secs) {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            run_on_start: default_enabled(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    24 * 60 * 60
}
