//! SweepTask - periodic activation of due cycles.
//!
//! For every active program and every learner who has ever been assigned
//! in it, creates the assignments for cycles whose activation time has
//! passed. Running it twice in a row creates nothing the second time.

use std::sync::Arc;

use serde::Serialize;

use crate::application::{CurriculumResolver, ProgressionOperator, ResolutionContext};
use crate::domain::foundation::DomainError;
use crate::ports::{AssignmentRepository, Clock};

/// Counters from one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Active programs visited.
    pub programs: usize,
    /// Learners examined across those programs.
    pub learners: usize,
    /// Assignments created.
    pub assignments_created: usize,
}

/// Creates assignments for every activated, unassigned cycle.
pub struct SweepTask {
    resolver: Arc<CurriculumResolver>,
    operator: Arc<ProgressionOperator>,
    assignments: Arc<dyn AssignmentRepository>,
    clock: Arc<dyn Clock>,
}

impl SweepTask {
    pub fn new(
        resolver: Arc<CurriculumResolver>,
        operator: Arc<ProgressionOperator>,
        assignments: Arc<dyn AssignmentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            operator,
            assignments,
            clock,
        }
    }

    /// Runs one sweep against the clock's current time.
    pub async fn run(&self) -> Result<SweepReport, DomainError> {
        let ctx = ResolutionContext::from_clock(self.clock.as_ref());
        self.run_in(&ctx).await
    }

    /// Runs one sweep inside an existing context.
    ///
    /// # Errors
    ///
    /// Storage faults and definition inconsistencies abort the run; the
    /// assignments created before the failure stay in place.
    pub async fn run_in(&self, ctx: &ResolutionContext) -> Result<SweepReport, DomainError> {
        let mut report = SweepReport::default();
        let programs = self.resolver.active_program_ids(ctx).await?;

        tracing::info!(
            programs = programs.len(),
            now = %ctx.now(),
            "Starting cycle activation sweep"
        );

        for program_id in programs {
            report.programs += 1;
            let learners = self.assignments.learners_in_program(&program_id).await?;

            for learner_id in learners {
                report.learners += 1;
                let active = self
                    .resolver
                    .user_active_cycles(ctx, &program_id, &learner_id)
                    .await?;

                for due in active.into_iter().filter(|a| a.needs_assignment()) {
                    let outcome = self
                        .operator
                        .assign(ctx, learner_id, due.cycle.id, due.activation_time)
                        .await?;
                    if outcome.is_created() {
                        report.assignments_created += 1;
                    }
                }
            }
        }

        tracing::info!(
            programs = report.programs,
            learners = report.learners,
            assignments_created = report.assignments_created,
            "Cycle activation sweep finished"
        );

        Ok(report)
    }
}
