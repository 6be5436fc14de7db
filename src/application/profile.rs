//! ProfileEventAdapter - keeps assignments in line with the learner's
//! declared programs.
//!
//! The programs a learner has open assignments in are compared with every
//! program the profile now declares. Newly declared programs get their
//! first cycle started; programs no longer declared have every open
//! assignment closed.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::application::{ProgressionError, ProgressionOperator, ResolutionContext};
use crate::domain::curriculum::{EndReason, ProfileEvent};
use crate::domain::foundation::{AssignmentId, DomainError, LearnerId, ProgramId};
use crate::ports::{AssignmentRepository, Clock, ProfileEventHandler};

/// What a profile event changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileSyncOutcome {
    /// Programs in which a first cycle was newly assigned.
    pub started: Vec<ProgramId>,
    /// Assignments that were closed.
    pub closed: Vec<AssignmentId>,
}

/// Reacts to profile changes and learner deletions.
pub struct ProfileEventAdapter {
    assignments: Arc<dyn AssignmentRepository>,
    operator: Arc<ProgressionOperator>,
    clock: Arc<dyn Clock>,
}

impl ProfileEventAdapter {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        operator: Arc<ProgressionOperator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            assignments,
            operator,
            clock,
        }
    }

    /// Applies one profile event using a fresh context.
    pub async fn sync(&self, event: &ProfileEvent) -> Result<ProfileSyncOutcome, DomainError> {
        let ctx = ResolutionContext::from_clock(self.clock.as_ref());
        self.sync_in(&ctx, event).await
    }

    /// Applies one profile event inside an existing context.
    pub async fn sync_in(
        &self,
        ctx: &ResolutionContext,
        event: &ProfileEvent,
    ) -> Result<ProfileSyncOutcome, DomainError> {
        let learner_id = event.learner_id();
        let open = self.assignments.open_program_ids(&learner_id).await?;

        let (declared, reason): (BTreeSet<ProgramId>, EndReason) = match event {
            ProfileEvent::ProfileChanged {
                previous_programs,
                declared_programs,
                ..
            } => {
                tracing::debug!(
                    learner_id = %learner_id,
                    previous = ?previous_programs.as_set(),
                    declared = ?declared_programs.as_set(),
                    "Profile programs changed"
                );
                (declared_programs.as_set().clone(), EndReason::ProgramChange)
            }
            ProfileEvent::LearnerDeleted { .. } => (BTreeSet::new(), EndReason::LearnerDeleted),
        };

        let mut outcome = ProfileSyncOutcome::default();

        for program_id in declared.difference(&open) {
            let started = self
                .operator
                .start_first_cycle(ctx, *program_id, learner_id)
                .await?;
            match started {
                Some(assign) if assign.is_created() => outcome.started.push(*program_id),
                Some(_) => {}
                None => tracing::warn!(
                    learner_id = %learner_id,
                    program_id = %program_id,
                    "Declared program has no active version or no cycles"
                ),
            }
        }

        for program_id in open.difference(&declared) {
            self.close_program(ctx, learner_id, program_id, reason, &mut outcome)
                .await?;
        }

        ctx.invalidate_learner(&learner_id);

        tracing::info!(
            learner_id = %learner_id,
            event = event.kind(),
            started = outcome.started.len(),
            closed = outcome.closed.len(),
            "Profile event applied"
        );

        Ok(outcome)
    }

    async fn close_program(
        &self,
        ctx: &ResolutionContext,
        learner_id: LearnerId,
        program_id: &ProgramId,
        reason: EndReason,
        outcome: &mut ProfileSyncOutcome,
    ) -> Result<(), DomainError> {
        let open = self
            .assignments
            .open_in_program(&learner_id, program_id)
            .await?;

        for assignment in open {
            match self
                .operator
                .close(assignment.id(), ctx.now(), reason)
                .await
            {
                Ok(closed) => outcome.closed.push(closed.id()),
                // Closed concurrently by another event; nothing left to do.
                Err(ProgressionError::AssignmentAlreadyEnded(id)) => tracing::debug!(
                    assignment_id = %id,
                    "Assignment already ended"
                ),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileEventHandler for ProfileEventAdapter {
    async fn handle(&self, event: &ProfileEvent) -> Result<(), DomainError> {
        self.sync(event).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "ProfileEventAdapter"
    }
}
