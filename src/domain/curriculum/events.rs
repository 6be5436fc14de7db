//! Curriculum domain events.
//!
//! - `CycleAssigned` - A learner received an assignment for an activated cycle
//! - `AssignmentClosed` - An open assignment was ended with a reason

use serde::{Deserialize, Serialize};

use super::assignment::EndReason;
use crate::domain::foundation::{
    domain_event, AssignmentId, CycleId, EventId, LearnerId, ProgramId, Timestamp,
};

// ════════════════════════════════════════════════════════════════════════════
// CycleAssigned
// ════════════════════════════════════════════════════════════════════════════

/// Published when an assignment is created for a learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleAssigned {
    /// Unique identifier for this event.
    pub event_id: EventId,

    pub assignment_id: AssignmentId,
    pub program_id: ProgramId,
    pub cycle_id: CycleId,
    pub learner_id: LearnerId,

    /// Activation time of the cycle, used as the assignment start.
    pub start: Timestamp,

    /// When the record was written.
    pub assigned_at: Timestamp,
}

domain_event!(
    CycleAssigned,
    event_type = "cycle.assigned.v1",
    aggregate_id = assignment_id,
    aggregate_type = "Assignment",
    occurred_at = assigned_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// AssignmentClosed
// ════════════════════════════════════════════════════════════════════════════

/// Published when an open assignment is ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentClosed {
    /// Unique identifier for this event.
    pub event_id: EventId,

    pub assignment_id: AssignmentId,
    pub cycle_id: CycleId,
    pub learner_id: LearnerId,
    pub reason: EndReason,

    /// Recorded end timestamp.
    pub closed_at: Timestamp,
}

domain_event!(
    AssignmentClosed,
    event_type = "assignment.closed.v1",
    aggregate_id = assignment_id,
    aggregate_type = "Assignment",
    occurred_at = closed_at,
    event_id = event_id
);
