//! Profile event queue configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Queueing and retry of profile events posted by the host platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEventsConfig {
    /// Events buffered ahead of the worker before senders wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Attempts per event on database or internal faults, first one included
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry; doubles on each further attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound on the delay between attempts
    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,
}

impl ProfileEventsConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn retry_max_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_max_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if !(1..=20).contains(&self.retry_attempts) {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        if self.retry_backoff_ms > self.retry_max_backoff_ms {
            return Err(ValidationError::InvalidRetryBackoff);
        }
        Ok(())
    }
}

impl Default for ProfileEventsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_retry_max_backoff_ms() -> u64 {
    10_000
}
