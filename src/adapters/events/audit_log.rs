//! AssignmentAuditLog - writes assignment lifecycle events to the log.
//!
//! ## Usage
//!
//! ```ignore
//! let audit = Arc::new(AssignmentAuditLog::new());
//! event_bus.subscribe_all(AssignmentAuditLog::EVENT_TYPES, audit);
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::curriculum::{AssignmentClosed, CycleAssigned};
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventHandler;

/// Emits one structured log line per assignment event.
#[derive(Debug, Default)]
pub struct AssignmentAuditLog {
    assigned: AtomicU64,
    closed: AtomicU64,
}

impl AssignmentAuditLog {
    /// Event types this handler understands.
    pub const EVENT_TYPES: &'static [&'static str] =
        &["cycle.assigned.v1", "assignment.closed.v1"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Assignments logged since startup.
    pub fn assigned_count(&self) -> u64 {
        self.assigned.load(Ordering::Relaxed)
    }

    /// Closures logged since startup.
    pub fn closed_count(&self) -> u64 {
        self.closed.load(Ordering::Relaxed)
    }
}

fn malformed(envelope: &EventEnvelope, err: serde_json::Error) -> DomainError {
    DomainError::new(
        ErrorCode::InternalError,
        format!("Malformed {} payload: {}", envelope.event_type, err),
    )
    .with_detail("event_id", envelope.event_id.as_str())
}

#[async_trait]
impl EventHandler for AssignmentAuditLog {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        match envelope.event_type.as_str() {
            "cycle.assigned.v1" => {
                let event: CycleAssigned = envelope
                    .payload_as()
                    .map_err(|e| malformed(&envelope, e))?;
                self.assigned.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    target: "curriculum::audit",
                    assignment_id = %event.assignment_id,
                    program_id = %event.program_id,
                    cycle_id = %event.cycle_id,
                    learner_id = %event.learner_id,
                    start = %event.start,
                    "Cycle assigned"
                );
            }
            "assignment.closed.v1" => {
                let event: AssignmentClosed = envelope
                    .payload_as()
                    .map_err(|e| malformed(&envelope, e))?;
                self.closed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    target: "curriculum::audit",
                    assignment_id = %event.assignment_id,
                    cycle_id = %event.cycle_id,
                    learner_id = %event.learner_id,
                    reason = %event.reason,
                    end = %event.closed_at,
                    "Assignment closed"
                );
            }
            other => {
                tracing::debug!(event_type = other, "Audit log ignoring event");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AssignmentAuditLog"
    }
}
