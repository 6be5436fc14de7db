//! In-memory curriculum store.
//!
//! Holds definitions and assignments behind a single lock so that
//! `insert_if_absent` checks and inserts atomically. Useful for tests,
//! local development and single-process deployments; nothing survives a
//! restart.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::curriculum::{
    sort_by_stage, Assignment, Cycle, CycleItem, NewAssignment, Program, Version,
};
use crate::domain::foundation::{
    AssignmentId, CycleId, CycleItemId, DomainError, ErrorCode, LearnerId, ProgramId, VersionId,
};
use crate::ports::{
    AssignmentRepository, DefinitionReader, DefinitionRepository, InsertOutcome, ProgramAssignment,
};

#[derive(Debug, Default)]
struct State {
    programs: BTreeMap<ProgramId, Program>,
    versions: BTreeMap<VersionId, Version>,
    cycles: BTreeMap<CycleId, Cycle>,
    items: BTreeMap<CycleItemId, CycleItem>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    last_assignment_id: i64,
    /// Upcoming `insert_if_absent` calls that fail with a database error.
    failing_inserts: u32,
}

impl State {
    fn program_of_cycle(&self, cycle_id: &CycleId) -> Option<(ProgramId, VersionId)> {
        let cycle = self.cycles.get(cycle_id)?;
        let version = self.versions.get(&cycle.version_id)?;
        Some((version.program_id, version.id))
    }

    fn in_program<'a>(
        &'a self,
        program_id: &'a ProgramId,
    ) -> impl Iterator<Item = (&'a Assignment, VersionId)> + 'a {
        self.assignments.values().filter_map(move |a| {
            match self.program_of_cycle(&a.cycle_id()) {
                Some((program, version)) if program == *program_id => Some((a, version)),
                _ => None,
            }
        })
    }

    fn next_assignment_id(&mut self) -> AssignmentId {
        self.last_assignment_id += 1;
        AssignmentId::new(self.last_assignment_id)
    }
}

/// In-memory implementation of the definition and assignment ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCurriculumStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryCurriculumStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes the next `count` assignment inserts fail as if the database
    /// were unreachable.
    pub async fn fail_next_inserts(&self, count: u32) {
        self.state.write().await.failing_inserts = count;
    }

    /// Writes an assignment without the open-pair check.
    ///
    /// Lets tests seed history such as a closed record followed by a
    /// reopened one.
    pub async fn seed_assignment(&self, new: NewAssignment) -> Assignment {
        let mut state = self.state.write().await;
        let assignment = Assignment::opened(state.next_assignment_id(), new);
        state.assignments.insert(assignment.id(), assignment.clone());
        assignment
    }

    /// Every stored assignment, ordered by id.
    pub async fn all_assignments(&self) -> Vec<Assignment> {
        self.state.read().await.assignments.values().cloned().collect()
    }

    /// Number of stored assignments.
    pub async fn assignment_count(&self) -> usize {
        self.state.read().await.assignments.len()
    }
}

#[async_trait]
impl DefinitionReader for InMemoryCurriculumStore {
    async fn find_program(&self, id: &ProgramId) -> Result<Option<Program>, DomainError> {
        Ok(self.state.read().await.programs.get(id).cloned())
    }

    async fn list_programs(&self) -> Result<Vec<Program>, DomainError> {
        Ok(self.state.read().await.programs.values().cloned().collect())
    }

    async fn find_version(&self, id: &VersionId) -> Result<Option<Version>, DomainError> {
        Ok(self.state.read().await.versions.get(id).cloned())
    }

    async fn versions_by_program(
        &self,
        program_id: &ProgramId,
    ) -> Result<Vec<Version>, DomainError> {
        let state = self.state.read().await;
        let mut versions: Vec<Version> = state
            .versions
            .values()
            .filter(|v| v.program_id == *program_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| (v.start, v.id));
        Ok(versions)
    }

    async fn find_cycle(&self, id: &CycleId) -> Result<Option<Cycle>, DomainError> {
        Ok(self.state.read().await.cycles.get(id).cloned())
    }

    async fn cycles_by_version(&self, version_id: &VersionId) -> Result<Vec<Cycle>, DomainError> {
        let state = self.state.read().await;
        let mut cycles: Vec<Cycle> = state
            .cycles
            .values()
            .filter(|c| c.version_id == *version_id)
            .cloned()
            .collect();
        sort_by_stage(&mut cycles);
        Ok(cycles)
    }

    async fn find_cycle_item(&self, id: &CycleItemId) -> Result<Option<CycleItem>, DomainError> {
        Ok(self.state.read().await.items.get(id).cloned())
    }

    async fn items_by_cycle(&self, cycle_id: &CycleId) -> Result<Vec<CycleItem>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .items
            .values()
            .filter(|i| i.cycle_id == *cycle_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DefinitionRepository for InMemoryCurriculumStore {
    async fn save_program(&self, program: &Program) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .programs
            .insert(program.id, program.clone());
        Ok(())
    }

    async fn save_version(&self, version: &Version) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .versions
            .insert(version.id, version.clone());
        Ok(())
    }

    async fn save_cycle(&self, cycle: &Cycle) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .cycles
            .insert(cycle.id, cycle.clone());
        Ok(())
    }

    async fn save_cycle_item(&self, item: &CycleItem) -> Result<(), DomainError> {
        self.state.write().await.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_program(&self, id: &ProgramId) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .programs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| {
                DomainError::new(ErrorCode::ProgramNotFound, format!("Program not found: {}", id))
            })
    }

    async fn delete_version(&self, id: &VersionId) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .versions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| {
                DomainError::new(ErrorCode::VersionNotFound, format!("Version not found: {}", id))
            })
    }

    async fn delete_cycle(&self, id: &CycleId) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .cycles
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| {
                DomainError::new(ErrorCode::CycleNotFound, format!("Cycle not found: {}", id))
            })
    }

    async fn delete_cycle_item(&self, id: &CycleItemId) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .items
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::CycleItemNotFound,
                    format!("Cycle item not found: {}", id),
                )
            })
    }

    async fn program_has_versions(&self, id: &ProgramId) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .versions
            .values()
            .any(|v| v.program_id == *id))
    }

    async fn version_has_cycles(&self, id: &VersionId) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .cycles
            .values()
            .any(|c| c.version_id == *id))
    }

    async fn cycle_has_items(&self, id: &CycleId) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .items
            .values()
            .any(|i| i.cycle_id == *id))
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryCurriculumStore {
    async fn find_by_id(&self, id: &AssignmentId) -> Result<Option<Assignment>, DomainError> {
        Ok(self.state.read().await.assignments.get(id).cloned())
    }

    async fn list_for_learner_in_cycles(
        &self,
        learner_id: &LearnerId,
        cycle_ids: &[CycleId],
    ) -> Result<Vec<Assignment>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .values()
            .filter(|a| a.learner_id() == *learner_id && cycle_ids.contains(&a.cycle_id()))
            .cloned()
            .collect())
    }

    async fn earliest_in_program(
        &self,
        program_id: &ProgramId,
        learner_id: &LearnerId,
    ) -> Result<Option<ProgramAssignment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .in_program(program_id)
            .filter(|(a, _)| a.learner_id() == *learner_id)
            .min_by_key(|(a, _)| (a.start(), a.id()))
            .map(|(a, version_id)| ProgramAssignment {
                assignment: a.clone(),
                version_id,
            }))
    }

    async fn learners_in_program(
        &self,
        program_id: &ProgramId,
    ) -> Result<Vec<LearnerId>, DomainError> {
        let state = self.state.read().await;
        let learners: BTreeSet<LearnerId> = state
            .in_program(program_id)
            .map(|(a, _)| a.learner_id())
            .collect();
        Ok(learners.into_iter().collect())
    }

    async fn open_program_ids(
        &self,
        learner_id: &LearnerId,
    ) -> Result<BTreeSet<ProgramId>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .values()
            .filter(|a| a.learner_id() == *learner_id && a.is_open())
            .filter_map(|a| state.program_of_cycle(&a.cycle_id()).map(|(p, _)| p))
            .collect())
    }

    async fn open_in_program(
        &self,
        learner_id: &LearnerId,
        program_id: &ProgramId,
    ) -> Result<Vec<Assignment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .in_program(program_id)
            .map(|(a, _)| a)
            .filter(|a| a.learner_id() == *learner_id && a.is_open())
            .cloned()
            .collect())
    }

    async fn exists_for_cycle(&self, cycle_id: &CycleId) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .values()
            .any(|a| a.cycle_id() == *cycle_id))
    }

    async fn insert_if_absent(&self, new: NewAssignment) -> Result<InsertOutcome, DomainError> {
        let mut state = self.state.write().await;

        if state.failing_inserts > 0 {
            state.failing_inserts -= 1;
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Failed to insert assignment: connection refused",
            ));
        }

        let existing = state
            .assignments
            .values()
            .find(|a| a.learner_id() == new.learner_id && a.cycle_id() == new.cycle_id && a.is_open())
            .cloned();
        if let Some(existing) = existing {
            return Ok(InsertOutcome::AlreadyOpen(existing));
        }

        let assignment = Assignment::opened(state.next_assignment_id(), new);
        state.assignments.insert(assignment.id(), assignment.clone());
        Ok(InsertOutcome::Inserted(assignment))
    }

    async fn close(&self, assignment: &Assignment) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let stored = state.assignments.get_mut(&assignment.id()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::AssignmentNotFound,
                format!("Assignment not found: {}", assignment.id()),
            )
        })?;

        if !stored.is_open() {
            return Err(DomainError::new(
                ErrorCode::AssignmentAlreadyEnded,
                format!("Assignment {} has already ended", assignment.id()),
            ));
        }

        *stored = assignment.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::curriculum::{CoursePattern, EndReason};
    use crate::domain::foundation::Timestamp;

    fn program(id: i64) -> Program {
        Program {
            id: ProgramId::new(id),
            name: format!("Program {}", id),
            enabled: true,
            description: String::new(),
            created_at: Timestamp::from_unix_secs(0),
            modified_at: Timestamp::from_unix_secs(0),
        }
    }

    fn version(id: i64, program_id: i64, start: i64) -> Version {
        Version {
            id: VersionId::new(id),
            program_id: ProgramId::new(program_id),
            name: format!("v{}", id),
            description: String::new(),
            start: Timestamp::from_unix_secs(start),
            end: None,
        }
    }

    fn cycle(id: i64, version_id: i64, stage: i32, name: &str) -> Cycle {
        Cycle {
            id: CycleId::new(id),
            version_id: VersionId::new(version_id),
            name: name.to_string(),
            description: String::new(),
            duration_days: 10,
            stage,
        }
    }

    fn new_assignment(cycle_id: i64, learner_id: i64, start: i64) -> NewAssignment {
        NewAssignment {
            cycle_id: CycleId::new(cycle_id),
            learner_id: LearnerId::new(learner_id),
            start: Timestamp::from_unix_secs(start),
        }
    }

    async fn seeded() -> InMemoryCurriculumStore {
        let store = InMemoryCurriculumStore::new();
        store.save_program(&program(1)).await.unwrap();
        store.save_program(&program(2)).await.unwrap();
        store.save_version(&version(10, 1, 200)).await.unwrap();
        store.save_version(&version(11, 1, 100)).await.unwrap();
        store.save_version(&version(20, 2, 100)).await.unwrap();
        store.save_cycle(&cycle(100, 10, 2, "B")).await.unwrap();
        store.save_cycle(&cycle(101, 10, 1, "A")).await.unwrap();
        store.save_cycle(&cycle(110, 11, 1, "Old")).await.unwrap();
        store.save_cycle(&cycle(200, 20, 1, "Other")).await.unwrap();
        store
    }

    #[tokio::test]
    async fn versions_are_ordered_by_start() {
        let store = seeded().await;

        let versions = store.versions_by_program(&ProgramId::new(1)).await.unwrap();

        let ids: Vec<i64> = versions.iter().map(|v| v.id.as_i64()).collect();
        assert_eq!(ids, vec![11, 10]);
    }

    #[tokio::test]
    async fn cycles_are_ordered_by_stage() {
        let store = seeded().await;

        let cycles = store.cycles_by_version(&VersionId::new(10)).await.unwrap();

        let names: Vec<&str> = cycles.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_one_open_per_pair() {
        let store = seeded().await;

        let first = store.insert_if_absent(new_assignment(100, 7, 500)).await.unwrap();
        let second = store.insert_if_absent(new_assignment(100, 7, 900)).await.unwrap();

        assert!(first.was_inserted());
        assert!(!second.was_inserted());
        assert_eq!(second.assignment().id(), first.assignment().id());
        assert_eq!(store.assignment_count().await, 1);
    }

    #[tokio::test]
    async fn insert_if_absent_allows_new_record_after_close() {
        let store = seeded().await;
        let InsertOutcome::Inserted(mut first) =
            store.insert_if_absent(new_assignment(100, 7, 500)).await.unwrap()
        else {
            panic!("expected insert");
        };
        first
            .close(Timestamp::from_unix_secs(600), EndReason::ProgramChange)
            .unwrap();
        store.close(&first).await.unwrap();

        let again = store.insert_if_absent(new_assignment(100, 7, 700)).await.unwrap();

        assert!(again.was_inserted());
        assert_eq!(store.assignment_count().await, 2);
    }

    #[tokio::test]
    async fn injected_insert_failures_clear_after_count() {
        let store = seeded().await;
        store.fail_next_inserts(1).await;

        let err = store.insert_if_absent(new_assignment(100, 7, 500)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(store.assignment_count().await, 0);

        assert!(store
            .insert_if_absent(new_assignment(100, 7, 500))
            .await
            .unwrap()
            .was_inserted());
    }

    #[tokio::test]
    async fn concurrent_inserts_create_one_record() {
        let store = seeded().await;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.insert_if_absent(new_assignment(101, 3, 100)).await
            }));
        }
        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().was_inserted() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.assignment_count().await, 1);
    }

    #[tokio::test]
    async fn earliest_in_program_spans_versions() {
        let store = seeded().await;
        store.seed_assignment(new_assignment(100, 7, 900)).await;
        let old = store.seed_assignment(new_assignment(110, 7, 300)).await;
        store.seed_assignment(new_assignment(200, 7, 100)).await;

        let earliest = store
            .earliest_in_program(&ProgramId::new(1), &LearnerId::new(7))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(earliest.assignment.id(), old.id());
        assert_eq!(earliest.version_id, VersionId::new(11));
    }

    #[tokio::test]
    async fn learners_and_open_programs() {
        let store = seeded().await;
        store.seed_assignment(new_assignment(100, 9, 0)).await;
        store.seed_assignment(new_assignment(101, 3, 0)).await;
        store.seed_assignment(new_assignment(100, 3, 0)).await;
        let mut other = store.seed_assignment(new_assignment(200, 3, 0)).await;
        other
            .close(Timestamp::from_unix_secs(10), EndReason::Completed)
            .unwrap();
        store.close(&other).await.unwrap();

        let learners = store.learners_in_program(&ProgramId::new(1)).await.unwrap();
        assert_eq!(learners, vec![LearnerId::new(3), LearnerId::new(9)]);

        let open = store.open_program_ids(&LearnerId::new(3)).await.unwrap();
        assert_eq!(open.into_iter().collect::<Vec<_>>(), vec![ProgramId::new(1)]);

        let open_in_one = store
            .open_in_program(&LearnerId::new(3), &ProgramId::new(1))
            .await
            .unwrap();
        assert_eq!(open_in_one.len(), 2);
    }

    #[tokio::test]
    async fn close_rejects_already_ended_row() {
        let store = seeded().await;
        let mut a = store.seed_assignment(new_assignment(100, 1, 0)).await;
        a.close(Timestamp::from_unix_secs(5), EndReason::Completed)
            .unwrap();
        store.close(&a).await.unwrap();

        let err = store.close(&a).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::AssignmentAlreadyEnded);
    }

    #[tokio::test]
    async fn child_checks_and_deletes() {
        let store = seeded().await;
        store
            .save_cycle_item(&CycleItem {
                id: CycleItemId::new(1),
                cycle_id: CycleId::new(100),
                course_code: CoursePattern::new("BIO-%").unwrap(),
                group_template: None,
                conditions: None,
                validity_days: 0,
            })
            .await
            .unwrap();

        assert!(store.program_has_versions(&ProgramId::new(1)).await.unwrap());
        assert!(store.version_has_cycles(&VersionId::new(10)).await.unwrap());
        assert!(store.cycle_has_items(&CycleId::new(100)).await.unwrap());
        assert!(!store.cycle_has_items(&CycleId::new(101)).await.unwrap());

        store.delete_cycle_item(&CycleItemId::new(1)).await.unwrap();
        let err = store.delete_cycle_item(&CycleItemId::new(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CycleItemNotFound);
    }
}
