//! ProgressionOperator - the only writer of assignments.
//!
//! Creates assignments when cycles activate, enrolls the learner in the
//! cycle's courses and closes assignments when a learner leaves a program.
//! Writes for one (learner, cycle) pair are serialised in-process by
//! `AssignmentLocks`; across processes the store's insert-if-absent keeps
//! at most one open assignment per pair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::application::{CurriculumResolver, ResolutionContext};
use crate::domain::curriculum::{
    Assignment, AssignmentClosed, Cycle, CycleAssigned, CycleItem, EndReason, NewAssignment,
};
use crate::domain::foundation::{
    AssignmentId, CycleId, DomainError, ErrorCode, EventId, LearnerId, ProgramId,
    SerializableDomainEvent, Timestamp, VersionId,
};
use crate::ports::{
    AssignmentRepository, DefinitionReader, EnrollmentBridge, EnrollmentOutcome,
    EnrollmentRequest, EventPublisher, InsertOutcome,
};

/// Where and how learners are enrolled when a cycle is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentSettings {
    /// Enrollment channel (method) name.
    pub channel: String,
    /// Role shortname granted in each course.
    pub role: String,
}

impl Default for EnrollmentSettings {
    fn default() -> Self {
        Self {
            channel: "curriculum".to_string(),
            role: "student".to_string(),
        }
    }
}

/// Result of `assign`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// A new open assignment was written.
    Created(Assignment),
    /// The learner already held an open assignment for the cycle.
    AlreadyOpen(Assignment),
}

impl AssignOutcome {
    pub fn assignment(&self) -> &Assignment {
        match self {
            AssignOutcome::Created(a) | AssignOutcome::AlreadyOpen(a) => a,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, AssignOutcome::Created(_))
    }
}

/// Error type for progression operations.
#[derive(Debug, Clone)]
pub enum ProgressionError {
    /// The cycle to assign doesn't exist.
    CycleNotFound(CycleId),
    /// The cycle references a version that doesn't exist.
    VersionNotFound(VersionId),
    /// The assignment to close doesn't exist.
    AssignmentNotFound(AssignmentId),
    /// The assignment to close already has an end.
    AssignmentAlreadyEnded(AssignmentId),
    /// Storage or other domain failure, passed through unchanged.
    Domain(DomainError),
}

impl ProgressionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProgressionError::CycleNotFound(_) => ErrorCode::CycleNotFound,
            ProgressionError::VersionNotFound(_) => ErrorCode::VersionNotFound,
            ProgressionError::AssignmentNotFound(_) => ErrorCode::AssignmentNotFound,
            ProgressionError::AssignmentAlreadyEnded(_) => ErrorCode::AssignmentAlreadyEnded,
            ProgressionError::Domain(err) => err.code,
        }
    }
}

impl std::fmt::Display for ProgressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressionError::CycleNotFound(id) => write!(f, "Cycle not found: {}", id),
            ProgressionError::VersionNotFound(id) => write!(f, "Version not found: {}", id),
            ProgressionError::AssignmentNotFound(id) => write!(f, "Assignment not found: {}", id),
            ProgressionError::AssignmentAlreadyEnded(id) => {
                write!(f, "Assignment {} has already ended", id)
            }
            ProgressionError::Domain(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ProgressionError {}

impl From<DomainError> for ProgressionError {
    fn from(err: DomainError) -> Self {
        ProgressionError::Domain(err)
    }
}

impl From<ProgressionError> for DomainError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::Domain(inner) => inner,
            other => DomainError::new(other.code(), other.to_string()),
        }
    }
}

/// In-process locks keyed by (learner, cycle).
#[derive(Debug, Default)]
pub struct AssignmentLocks {
    slots: Mutex<HashMap<(LearnerId, CycleId), Arc<AsyncMutex<()>>>>,
}

impl AssignmentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the pair.
    pub async fn acquire(&self, learner_id: LearnerId, cycle_id: CycleId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Slots nobody holds or waits on are dropped here.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots
                .entry((learner_id, cycle_id))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Number of pairs currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Write side of the engine: assign, close, start first cycle.
pub struct ProgressionOperator {
    definitions: Arc<dyn DefinitionReader>,
    assignments: Arc<dyn AssignmentRepository>,
    enrollment: Arc<dyn EnrollmentBridge>,
    event_publisher: Arc<dyn EventPublisher>,
    resolver: Arc<CurriculumResolver>,
    settings: EnrollmentSettings,
    locks: AssignmentLocks,
}

impl ProgressionOperator {
    pub fn new(
        definitions: Arc<dyn DefinitionReader>,
        assignments: Arc<dyn AssignmentRepository>,
        enrollment: Arc<dyn EnrollmentBridge>,
        event_publisher: Arc<dyn EventPublisher>,
        resolver: Arc<CurriculumResolver>,
        settings: EnrollmentSettings,
    ) -> Self {
        Self {
            definitions,
            assignments,
            enrollment,
            event_publisher,
            resolver,
            settings,
            locks: AssignmentLocks::new(),
        }
    }

    /// Assigns the learner to a cycle starting at `start`.
    ///
    /// Returns `AlreadyOpen` without side effects if the learner already
    /// holds an open assignment for the cycle. On creation the learner is
    /// enrolled in every course matched by the cycle's items; enrollment
    /// problems are logged and do not fail the call.
    ///
    /// # Errors
    ///
    /// - `CycleNotFound` / `VersionNotFound` on inconsistent definitions
    /// - `Domain` for storage faults
    pub async fn assign(
        &self,
        ctx: &ResolutionContext,
        learner_id: LearnerId,
        cycle_id: CycleId,
        start: Timestamp,
    ) -> Result<AssignOutcome, ProgressionError> {
        let _guard = self.locks.acquire(learner_id, cycle_id).await;

        let cycle = self
            .definitions
            .find_cycle(&cycle_id)
            .await?
            .ok_or(ProgressionError::CycleNotFound(cycle_id))?;
        let version = self
            .definitions
            .find_version(&cycle.version_id)
            .await?
            .ok_or(ProgressionError::VersionNotFound(cycle.version_id))?;
        let items = self.definitions.items_by_cycle(&cycle.id).await?;

        let outcome = self
            .assignments
            .insert_if_absent(NewAssignment {
                cycle_id,
                learner_id,
                start,
            })
            .await?;

        let assignment = match outcome {
            InsertOutcome::AlreadyOpen(existing) => {
                tracing::debug!(
                    learner_id = %learner_id,
                    cycle_id = %cycle_id,
                    assignment_id = %existing.id(),
                    "Learner already holds an open assignment"
                );
                return Ok(AssignOutcome::AlreadyOpen(existing));
            }
            InsertOutcome::Inserted(created) => created,
        };

        ctx.invalidate_learner(&learner_id);

        tracing::info!(
            learner_id = %learner_id,
            cycle_id = %cycle_id,
            program_id = %version.program_id,
            assignment_id = %assignment.id(),
            start = %start,
            "Cycle assigned"
        );

        self.enroll_in_items(&cycle, &items, learner_id).await;

        let event = CycleAssigned {
            event_id: EventId::new(),
            assignment_id: assignment.id(),
            program_id: version.program_id,
            cycle_id,
            learner_id,
            start,
            assigned_at: ctx.now(),
        };
        self.publish(event).await;

        Ok(AssignOutcome::Created(assignment))
    }

    /// Ends an open assignment with a reason.
    ///
    /// # Errors
    ///
    /// - `AssignmentNotFound` if the assignment doesn't exist
    /// - `AssignmentAlreadyEnded` if it was closed before
    /// - `Domain` for storage faults
    pub async fn close(
        &self,
        assignment_id: AssignmentId,
        end: Timestamp,
        reason: EndReason,
    ) -> Result<Assignment, ProgressionError> {
        let mut assignment = self
            .assignments
            .find_by_id(&assignment_id)
            .await?
            .ok_or(ProgressionError::AssignmentNotFound(assignment_id))?;

        let _guard = self
            .locks
            .acquire(assignment.learner_id(), assignment.cycle_id())
            .await;

        assignment
            .close(end, reason)
            .map_err(|_| ProgressionError::AssignmentAlreadyEnded(assignment_id))?;

        self.assignments
            .close(&assignment)
            .await
            .map_err(|err| match err.code {
                ErrorCode::AssignmentAlreadyEnded => {
                    ProgressionError::AssignmentAlreadyEnded(assignment_id)
                }
                ErrorCode::AssignmentNotFound => ProgressionError::AssignmentNotFound(assignment_id),
                _ => ProgressionError::Domain(err),
            })?;

        tracing::info!(
            assignment_id = %assignment_id,
            learner_id = %assignment.learner_id(),
            cycle_id = %assignment.cycle_id(),
            reason = %reason,
            "Assignment closed"
        );

        let event = AssignmentClosed {
            event_id: EventId::new(),
            assignment_id,
            cycle_id: assignment.cycle_id(),
            learner_id: assignment.learner_id(),
            reason,
            closed_at: end,
        };
        self.publish(event).await;

        Ok(assignment)
    }

    /// Assigns the first cycle of the program's active version, starting now.
    ///
    /// Returns `None` when the program has no active version or the version
    /// has no cycles.
    pub async fn start_first_cycle(
        &self,
        ctx: &ResolutionContext,
        program_id: ProgramId,
        learner_id: LearnerId,
    ) -> Result<Option<AssignOutcome>, ProgressionError> {
        let Some(first) = self.resolver.first_cycle(ctx, &program_id).await? else {
            tracing::debug!(
                program_id = %program_id,
                learner_id = %learner_id,
                "Program has no active version or no cycles; nothing to start"
            );
            return Ok(None);
        };

        self.assign(ctx, learner_id, first.id, ctx.now())
            .await
            .map(Some)
    }

    async fn enroll_in_items(&self, cycle: &Cycle, items: &[CycleItem], learner_id: LearnerId) {
        for item in items {
            let courses = match self.enrollment.resolve_courses(&item.course_code).await {
                Ok(courses) => courses,
                Err(e) => {
                    tracing::warn!(
                        cycle_id = %cycle.id,
                        item_id = %item.id,
                        course_code = %item.course_code,
                        error = %e,
                        "Failed to resolve courses for cycle item"
                    );
                    continue;
                }
            };

            if courses.is_empty() {
                tracing::debug!(
                    cycle_id = %cycle.id,
                    course_code = %item.course_code,
                    "No course matches cycle item"
                );
            }

            for course in courses {
                let request = EnrollmentRequest {
                    course_id: course.id,
                    learner_id,
                    role: self.settings.role.clone(),
                    channel: self.settings.channel.clone(),
                };
                match self.enrollment.enroll(&request).await {
                    Ok(EnrollmentOutcome::Enrolled) => tracing::info!(
                        learner_id = %learner_id,
                        course_id = %course.id,
                        course = %course.idnumber,
                        "Learner enrolled"
                    ),
                    Ok(EnrollmentOutcome::AlreadyEnrolled) => tracing::debug!(
                        learner_id = %learner_id,
                        course_id = %course.id,
                        "Learner already enrolled"
                    ),
                    Ok(EnrollmentOutcome::Unavailable) => tracing::warn!(
                        learner_id = %learner_id,
                        course_id = %course.id,
                        channel = %self.settings.channel,
                        "Enrollment channel unavailable for course"
                    ),
                    Err(e) => tracing::warn!(
                        learner_id = %learner_id,
                        course_id = %course.id,
                        error = %e,
                        "Failed to enroll learner"
                    ),
                }
            }
        }
    }

    async fn publish<E: SerializableDomainEvent>(&self, event: E) {
        let envelope = match event.to_envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(event_type = event.event_type(), error = %e, "Failed to serialize event");
                return;
            }
        };
        if let Err(e) = self.event_publisher.publish(envelope).await {
            tracing::warn!(event_type = event.event_type(), error = %e, "Failed to publish event");
        }
    }
}
