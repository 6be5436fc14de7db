//! SweepScheduler - runs the cycle activation sweep on a fixed interval.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 24h | Time between sweeps |
//! | `run_on_start` | true | Sweep immediately at startup |
//!
//! A failed sweep is logged and retried on the next tick. Ticks missed
//! while a sweep is still running are skipped rather than bunched up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::application::{SweepReport, SweepTask};

/// Configuration for the SweepScheduler.
#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
    pub interval: Duration,
    pub run_on_start: bool,
}

impl Default for SweepSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            run_on_start: true,
        }
    }
}

impl SweepSchedulerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }
}

/// Background service that triggers the sweep.
pub struct SweepScheduler {
    task: Arc<SweepTask>,
    config: SweepSchedulerConfig,
}

impl SweepScheduler {
    pub fn new(task: Arc<SweepTask>, config: SweepSchedulerConfig) -> Self {
        Self { task, config }
    }

    /// Runs sweeps until the shutdown signal is received. Returns the
    /// number of sweeps that completed successfully.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> usize {
        let start = if self.config.run_on_start {
            Instant::now()
        } else {
            Instant::now() + self.config.interval
        };
        let mut interval = time::interval_at(start, self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            run_on_start = self.config.run_on_start,
            "Sweep scheduler started"
        );

        let mut completed = 0;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(completed, "Sweep scheduler stopped");
                        return completed;
                    }
                }

                _ = interval.tick() => {
                    if self.tick_once().await.is_some() {
                        completed += 1;
                    }
                }
            }
        }
    }

    /// Runs one sweep, logging a failure instead of returning it.
    pub async fn tick_once(&self) -> Option<SweepReport> {
        match self.task.run().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(
                    code = %e.code,
                    error = %e,
                    "Cycle activation sweep failed; retrying on next tick"
                );
                None
            }
        }
    }
}
