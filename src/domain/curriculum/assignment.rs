//! Assignment entity - a learner occupying a cycle.
//!
//! Assignments are the only records the engine writes. They are created
//! open (no end) when a cycle activates for a learner and are closed once,
//! with a reason, when the learner leaves the program.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{
    AssignmentId, CycleId, DomainError, ErrorCode, LearnerId, StateMachine, Timestamp,
    ValidationError,
};

/// Why an assignment was ended.
///
/// Persisted as small integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Completed,
    ProgramChange,
    LearnerDeleted,
    Homologated,
}

impl EndReason {
    /// Storage code for this reason.
    pub fn code(&self) -> i16 {
        match self {
            EndReason::Completed => 1,
            EndReason::ProgramChange => 2,
            EndReason::LearnerDeleted => 3,
            EndReason::Homologated => 4,
        }
    }

    /// Parses a storage code.
    pub fn from_code(code: i16) -> Result<Self, ValidationError> {
        match code {
            1 => Ok(EndReason::Completed),
            2 => Ok(EndReason::ProgramChange),
            3 => Ok(EndReason::LearnerDeleted),
            4 => Ok(EndReason::Homologated),
            other => Err(ValidationError::out_of_range("end_reason", 1, 4, other as i64)),
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndReason::Completed => "Completed",
            EndReason::ProgramChange => "Program change",
            EndReason::LearnerDeleted => "Learner deleted",
            EndReason::Homologated => "Homologated",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum AssignmentStatus {
    Open,
    Ended(Option<EndReason>),
}

impl StateMachine for AssignmentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!((self, target), (AssignmentStatus::Open, AssignmentStatus::Ended(_)))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            AssignmentStatus::Open => vec![
                AssignmentStatus::Ended(Some(EndReason::Completed)),
                AssignmentStatus::Ended(Some(EndReason::ProgramChange)),
                AssignmentStatus::Ended(Some(EndReason::LearnerDeleted)),
                AssignmentStatus::Ended(Some(EndReason::Homologated)),
            ],
            AssignmentStatus::Ended(_) => vec![],
        }
    }
}

/// Values for a not-yet-persisted assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAssignment {
    pub cycle_id: CycleId,
    pub learner_id: LearnerId,
    pub start: Timestamp,
}

/// A learner's occupancy of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    id: AssignmentId,
    cycle_id: CycleId,
    learner_id: LearnerId,
    start: Timestamp,
    end: Option<Timestamp>,
    end_reason: Option<EndReason>,
}

impl Assignment {
    /// Reconstitute an assignment from persistence.
    pub fn reconstitute(
        id: AssignmentId,
        cycle_id: CycleId,
        learner_id: LearnerId,
        start: Timestamp,
        end: Option<Timestamp>,
        end_reason: Option<EndReason>,
    ) -> Self {
        Self {
            id,
            cycle_id,
            learner_id,
            start,
            end,
            end_reason,
        }
    }

    /// Materialise a freshly inserted row.
    pub fn opened(id: AssignmentId, new: NewAssignment) -> Self {
        Self::reconstitute(id, new.cycle_id, new.learner_id, new.start, None, None)
    }

    pub fn id(&self) -> AssignmentId {
        self.id
    }

    pub fn cycle_id(&self) -> CycleId {
        self.cycle_id
    }

    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Option<Timestamp> {
        self.end
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Open means no end timestamp has been recorded.
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> AssignmentStatus {
        if self.is_open() {
            AssignmentStatus::Open
        } else {
            AssignmentStatus::Ended(self.end_reason)
        }
    }

    /// Ends the assignment.
    ///
    /// # Errors
    ///
    /// - `AssignmentAlreadyEnded` if an end was already recorded
    pub fn close(&mut self, end: Timestamp, reason: EndReason) -> Result<(), DomainError> {
        self.status()
            .transition_to(AssignmentStatus::Ended(Some(reason)))
            .map_err(|_| {
                DomainError::new(
                    ErrorCode::AssignmentAlreadyEnded,
                    format!("Assignment {} has already ended", self.id),
                )
            })?;
        self.end = Some(end);
        self.end_reason = Some(reason);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_assignment() -> Assignment {
        Assignment::opened(
            AssignmentId::new(5),
            NewAssignment {
                cycle_id: CycleId::new(2),
                learner_id: LearnerId::new(9),
                start: Timestamp::from_unix_secs(1_000),
            },
        )
    }

    #[test]
    fn new_assignment_is_open() {
        let a = open_assignment();
        assert!(a.is_open());
        assert_eq!(a.status(), AssignmentStatus::Open);
        assert_eq!(a.end_reason(), None);
    }

    #[test]
    fn close_records_end_and_reason() {
        let mut a = open_assignment();

        a.close(Timestamp::from_unix_secs(2_000), EndReason::ProgramChange)
            .unwrap();

        assert!(!a.is_open());
        assert_eq!(a.end(), Some(Timestamp::from_unix_secs(2_000)));
        assert_eq!(
            a.status(),
            AssignmentStatus::Ended(Some(EndReason::ProgramChange))
        );
    }

    #[test]
    fn closing_twice_fails() {
        let mut a = open_assignment();
        a.close(Timestamp::from_unix_secs(2_000), EndReason::Completed)
            .unwrap();

        let err = a
            .close(Timestamp::from_unix_secs(3_000), EndReason::LearnerDeleted)
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::AssignmentAlreadyEnded);
        assert_eq!(a.end_reason(), Some(EndReason::Completed));
    }

    #[test]
    fn end_reason_codes_are_stable() {
        for reason in [
            EndReason::Completed,
            EndReason::ProgramChange,
            EndReason::LearnerDeleted,
            EndReason::Homologated,
        ] {
            assert_eq!(EndReason::from_code(reason.code()).unwrap(), reason);
        }
        assert!(EndReason::from_code(0).is_err());
    }

    #[test]
    fn ended_status_is_terminal() {
        assert!(AssignmentStatus::Ended(None).is_terminal());
        assert!(!AssignmentStatus::Open.is_terminal());
    }

    #[test]
    fn end_reason_serializes_snake_case() {
        let json = serde_json::to_string(&EndReason::ProgramChange).unwrap();
        assert_eq!(json, "\"program_change\"");
    }
}
