//! Assignment repository port.
//!
//! Assignments are the only records the engine writes. Besides plain
//! lookups the port exposes the program-scoped queries the resolver needs
//! and an atomic insert-if-absent used to keep at most one open assignment
//! per (learner, cycle).

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::curriculum::{Assignment, NewAssignment};
use crate::domain::foundation::{
    AssignmentId, CycleId, DomainError, LearnerId, ProgramId, VersionId,
};

/// Result of `insert_if_absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new open assignment was written.
    Inserted(Assignment),
    /// An open assignment for the pair already existed; nothing was written.
    AlreadyOpen(Assignment),
}

impl InsertOutcome {
    pub fn assignment(&self) -> &Assignment {
        match self {
            InsertOutcome::Inserted(a) | InsertOutcome::AlreadyOpen(a) => a,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// An assignment together with the version its cycle belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAssignment {
    pub assignment: Assignment,
    pub version_id: VersionId,
}

/// Repository port for assignments.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Find an assignment by ID. Returns `None` if not found.
    async fn find_by_id(&self, id: &AssignmentId) -> Result<Option<Assignment>, DomainError>;

    /// A learner's assignments restricted to the given cycles.
    async fn list_for_learner_in_cycles(
        &self,
        learner_id: &LearnerId,
        cycle_ids: &[CycleId],
    ) -> Result<Vec<Assignment>, DomainError>;

    /// The learner's earliest assignment (by start, then id) to any cycle of
    /// any version of the program, with that cycle's version.
    async fn earliest_in_program(
        &self,
        program_id: &ProgramId,
        learner_id: &LearnerId,
    ) -> Result<Option<ProgramAssignment>, DomainError>;

    /// Distinct learners holding any assignment under the program, ascending.
    async fn learners_in_program(&self, program_id: &ProgramId)
        -> Result<Vec<LearnerId>, DomainError>;

    /// Programs in which the learner holds at least one open assignment.
    async fn open_program_ids(&self, learner_id: &LearnerId)
        -> Result<BTreeSet<ProgramId>, DomainError>;

    /// The learner's open assignments under the program.
    async fn open_in_program(
        &self,
        learner_id: &LearnerId,
        program_id: &ProgramId,
    ) -> Result<Vec<Assignment>, DomainError>;

    /// True if any learner has an assignment (open or ended) to the cycle.
    async fn exists_for_cycle(&self, cycle_id: &CycleId) -> Result<bool, DomainError>;

    /// Atomically inserts an open assignment unless the learner already holds
    /// an open one for the same cycle.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert_if_absent(&self, new: NewAssignment) -> Result<InsertOutcome, DomainError>;

    /// Persists the end and reason of an assignment closed in memory.
    ///
    /// # Errors
    ///
    /// - `AssignmentNotFound` if the assignment doesn't exist
    /// - `AssignmentAlreadyEnded` if the stored row is no longer open
    /// - `DatabaseError` on persistence failure
    async fn close(&self, assignment: &Assignment) -> Result<(), DomainError>;
}
