//! Profile event delivery.
//!
//! Profile changes arrive from the HTTP surface and are applied by a
//! single background worker, so events for the same learner are handled in
//! the order they were received.
//!
//! ## Flow
//!
//! 1. `ProfileEventSender::send` queues the event (bounded channel)
//! 2. `ProfileEventWorker::run` takes events off the queue
//! 3. `ProfileEventDispatcher` hands each event to every registered handler
//!
//! ## Retries
//!
//! The HTTP caller has already been answered when an event is applied, so
//! a handler failing with a transient fault (database or internal error)
//! is retried with exponential backoff per `RetryPolicy`. Other errors are
//! logged once and not retried.
//!
//! ## Graceful Shutdown
//!
//! On shutdown the worker stops accepting new events and drains what is
//! already queued before returning.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::domain::curriculum::ProfileEvent;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::ProfileEventHandler;

/// How often a handler is retried on transient faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per handler, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Delay before attempt `attempt + 1`, doubling from the initial backoff.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Fans one profile event out to all registered handlers.
///
/// A failing handler is logged and does not prevent the others from
/// running.
#[derive(Default)]
pub struct ProfileEventDispatcher {
    handlers: Vec<Arc<dyn ProfileEventHandler>>,
    retry: RetryPolicy,
}

impl ProfileEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler. Handlers run in registration order.
    pub fn register(mut self, handler: Arc<dyn ProfileEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Delivers `event` to every handler and returns how many failed for
    /// good.
    pub async fn dispatch(&self, event: &ProfileEvent) -> usize {
        let mut failures = 0;
        for handler in &self.handlers {
            if !self.deliver(handler.as_ref(), event).await {
                failures += 1;
            }
        }
        failures
    }

    async fn deliver(&self, handler: &dyn ProfileEventHandler, event: &ProfileEvent) -> bool {
        let mut attempt = 1;
        loop {
            let err = match handler.handle(event).await {
                Ok(()) => return true,
                Err(err) => err,
            };

            if !err.code.is_transient() || attempt >= self.retry.max_attempts {
                tracing::error!(
                    handler = handler.name(),
                    learner_id = %event.learner_id(),
                    event = event.kind(),
                    attempts = attempt,
                    error = %err,
                    "Profile event handler failed"
                );
                return false;
            }

            let delay = self.retry.backoff(attempt);
            tracing::warn!(
                handler = handler.name(),
                learner_id = %event.learner_id(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Profile event handler failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Creates a connected sender/worker pair.
pub fn profile_channel(
    capacity: usize,
    dispatcher: Arc<ProfileEventDispatcher>,
) -> (ProfileEventSender, ProfileEventWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ProfileEventSender { tx },
        ProfileEventWorker { rx, dispatcher },
    )
}

/// Cloneable handle for queueing profile events.
#[derive(Clone)]
pub struct ProfileEventSender {
    tx: mpsc::Sender<ProfileEvent>,
}

impl ProfileEventSender {
    /// Queues an event, waiting for room if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` once the worker has stopped.
    pub async fn send(&self, event: ProfileEvent) -> Result<(), DomainError> {
        self.tx.send(event).await.map_err(|e| {
            DomainError::new(ErrorCode::InternalError, "Profile event worker is not running")
                .with_detail("learner_id", e.0.learner_id().to_string())
        })
    }
}

/// Background consumer of queued profile events.
pub struct ProfileEventWorker {
    rx: mpsc::Receiver<ProfileEvent>,
    dispatcher: Arc<ProfileEventDispatcher>,
}

impl ProfileEventWorker {
    /// Processes events until shutdown is signalled or every sender is
    /// dropped. Returns the number of events processed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut processed = 0;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped shutdown sender counts as a shutdown request.
                    if changed.is_err() || *shutdown.borrow() {
                        self.rx.close();
                        while let Some(event) = self.rx.recv().await {
                            self.dispatcher.dispatch(&event).await;
                            processed += 1;
                        }
                        tracing::info!(processed, "Profile event worker stopped");
                        return processed;
                    }
                }

                received = self.rx.recv() => {
                    match received {
                        Some(event) => {
                            self.dispatcher.dispatch(&event).await;
                            processed += 1;
                        }
                        None => {
                            tracing::info!(processed, "Profile event queue closed");
                            return processed;
                        }
                    }
                }
            }
        }
    }
}
