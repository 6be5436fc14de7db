//! CurriculumResolver - read-side decisions about programs and learners.
//!
//! Answers which version is active, which cycle comes first and which
//! cycles are active for a learner. Nothing here writes; every answer is
//! taken against the `now` frozen in the `ResolutionContext` and memoised
//! there.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::application::ResolutionContext;
use crate::domain::curriculum::{
    active_cycles, first_in_stage_order, learner_timeline, select_active_version, sort_by_stage,
    ActiveCycle, Assignment, Cycle, LearnerTimeline, Version,
};
use crate::domain::foundation::{DomainError, LearnerId, ProgramId, VersionId};
use crate::ports::{AssignmentRepository, DefinitionReader, ProgramAssignment};

/// Pure read logic over the definition and assignment stores.
pub struct CurriculumResolver {
    definitions: Arc<dyn DefinitionReader>,
    assignments: Arc<dyn AssignmentRepository>,
}

impl CurriculumResolver {
    pub fn new(
        definitions: Arc<dyn DefinitionReader>,
        assignments: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            definitions,
            assignments,
        }
    }

    /// The program's version in force at `ctx.now()`.
    pub async fn active_version(
        &self,
        ctx: &ResolutionContext,
        program_id: &ProgramId,
    ) -> Result<Option<Version>, DomainError> {
        if let Some(cached) = ctx.cached_active_version(program_id) {
            return Ok(cached);
        }

        let versions = self.definitions.versions_by_program(program_id).await?;
        let active = select_active_version(&versions, ctx.now()).cloned();

        ctx.store_active_version(*program_id, active.clone());
        Ok(active)
    }

    /// Enabled programs that have an active version at `ctx.now()`.
    pub async fn active_program_ids(
        &self,
        ctx: &ResolutionContext,
    ) -> Result<BTreeSet<ProgramId>, DomainError> {
        let mut active = BTreeSet::new();
        for program in self.definitions.list_programs().await? {
            if !program.enabled {
                continue;
            }
            if self.active_version(ctx, &program.id).await?.is_some() {
                active.insert(program.id);
            }
        }
        Ok(active)
    }

    /// Lowest (stage, name) cycle of the program's active version.
    pub async fn first_cycle(
        &self,
        ctx: &ResolutionContext,
        program_id: &ProgramId,
    ) -> Result<Option<Cycle>, DomainError> {
        let Some(version) = self.active_version(ctx, program_id).await? else {
            return Ok(None);
        };

        if let Some(cached) = ctx.cached_first_cycle(&version.id) {
            return Ok(cached);
        }

        let cycles = self.cycles_of(ctx, &version.id).await?;
        let first = first_in_stage_order(&cycles).cloned();

        ctx.store_first_cycle(version.id, first.clone());
        Ok(first)
    }

    /// Cycles currently active for the learner in the program.
    ///
    /// Timing is anchored on the learner's earliest assignment under the
    /// program and walks the cycles of the version that assignment belongs
    /// to, not the program's currently active version.
    pub async fn user_active_cycles(
        &self,
        ctx: &ResolutionContext,
        program_id: &ProgramId,
        learner_id: &LearnerId,
    ) -> Result<Vec<ActiveCycle>, DomainError> {
        if let Some(cached) = ctx.cached_learner_cycles(program_id, learner_id) {
            return Ok(cached);
        }

        let active = match self.anchor(program_id, learner_id).await? {
            None => Vec::new(),
            Some(anchor) => {
                let (cycles, assignments) =
                    self.walk_inputs(ctx, &anchor.version_id, learner_id).await?;
                active_cycles(anchor.assignment.start(), &cycles, &assignments, ctx.now())
            }
        };

        tracing::debug!(
            program_id = %program_id,
            learner_id = %learner_id,
            active = active.len(),
            "Resolved active cycles"
        );

        ctx.store_learner_cycles(*program_id, *learner_id, active.clone());
        Ok(active)
    }

    /// Stage-by-stage timeline for the learner, or `None` if the learner has
    /// never been assigned in the program.
    pub async fn learner_timeline(
        &self,
        ctx: &ResolutionContext,
        program_id: &ProgramId,
        learner_id: &LearnerId,
    ) -> Result<Option<LearnerTimeline>, DomainError> {
        let Some(anchor) = self.anchor(program_id, learner_id).await? else {
            return Ok(None);
        };

        let (cycles, assignments) = self.walk_inputs(ctx, &anchor.version_id, learner_id).await?;
        Ok(Some(learner_timeline(
            anchor.assignment.start(),
            &cycles,
            &assignments,
            ctx.now(),
        )))
    }

    async fn anchor(
        &self,
        program_id: &ProgramId,
        learner_id: &LearnerId,
    ) -> Result<Option<ProgramAssignment>, DomainError> {
        self.assignments
            .earliest_in_program(program_id, learner_id)
            .await
    }

    async fn walk_inputs(
        &self,
        ctx: &ResolutionContext,
        version_id: &VersionId,
        learner_id: &LearnerId,
    ) -> Result<(Vec<Cycle>, Vec<Assignment>), DomainError> {
        let cycles = self.cycles_of(ctx, version_id).await?;
        let cycle_ids: Vec<_> = cycles.iter().map(|c| c.id).collect();
        let assignments = self
            .assignments
            .list_for_learner_in_cycles(learner_id, &cycle_ids)
            .await?;
        Ok((cycles, assignments))
    }

    async fn cycles_of(
        &self,
        ctx: &ResolutionContext,
        version_id: &VersionId,
    ) -> Result<Vec<Cycle>, DomainError> {
        if let Some(cached) = ctx.cached_cycles(version_id) {
            return Ok(cached);
        }

        let mut cycles = self.definitions.cycles_by_version(version_id).await?;
        sort_by_stage(&mut cycles);

        ctx.store_cycles(*version_id, cycles.clone());
        Ok(cycles)
    }
}
