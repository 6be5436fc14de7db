//! DeleteDefinitionHandler - Command handler for removing curriculum
//! definitions.
//!
//! Definitions are removed leaf-first. Every structural check runs before
//! anything is deleted.

use std::sync::Arc;

use crate::domain::curriculum::{DefinitionKind, StructureViolation};
use crate::domain::foundation::{
    CycleId, CycleItemId, DomainError, ErrorCode, ProgramId, VersionId,
};
use crate::ports::{AssignmentRepository, DefinitionReader, DefinitionRepository};

/// Command to delete one definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDefinitionCommand {
    DeleteProgram(ProgramId),
    DeleteVersion(VersionId),
    DeleteCycle(CycleId),
    DeleteCycleItem(CycleItemId),
}

impl DeleteDefinitionCommand {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            DeleteDefinitionCommand::DeleteProgram(_) => DefinitionKind::Program,
            DeleteDefinitionCommand::DeleteVersion(_) => DefinitionKind::Version,
            DeleteDefinitionCommand::DeleteCycle(_) => DefinitionKind::Cycle,
            DeleteDefinitionCommand::DeleteCycleItem(_) => DefinitionKind::CycleItem,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            DeleteDefinitionCommand::DeleteProgram(id) => id.as_i64(),
            DeleteDefinitionCommand::DeleteVersion(id) => id.as_i64(),
            DeleteDefinitionCommand::DeleteCycle(id) => id.as_i64(),
            DeleteDefinitionCommand::DeleteCycleItem(id) => id.as_i64(),
        }
    }
}

/// Result of a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteDefinitionResult {
    pub kind: DefinitionKind,
    pub id: i64,
}

/// Error type for deleting definitions.
#[derive(Debug, Clone)]
pub enum DeleteDefinitionError {
    /// The target doesn't exist.
    NotFound { kind: DefinitionKind, id: i64 },
    /// Something still depends on the target.
    Violation(StructureViolation),
    /// Infrastructure error.
    Infrastructure(DomainError),
}

impl DeleteDefinitionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DeleteDefinitionError::NotFound { kind, .. } => match kind {
                DefinitionKind::Program => ErrorCode::ProgramNotFound,
                DefinitionKind::Version => ErrorCode::VersionNotFound,
                DefinitionKind::Cycle => ErrorCode::CycleNotFound,
                DefinitionKind::CycleItem => ErrorCode::CycleItemNotFound,
            },
            DeleteDefinitionError::Violation(_) => ErrorCode::StructureViolation,
            DeleteDefinitionError::Infrastructure(err) => err.code,
        }
    }
}

impl std::fmt::Display for DeleteDefinitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteDefinitionError::NotFound { kind, id } => {
                write!(f, "The {} with id {} does not exist", kind, id)
            }
            DeleteDefinitionError::Violation(v) => write!(f, "{}", v),
            DeleteDefinitionError::Infrastructure(err) => write!(f, "Infrastructure error: {}", err),
        }
    }
}

impl std::error::Error for DeleteDefinitionError {}

impl From<DomainError> for DeleteDefinitionError {
    fn from(err: DomainError) -> Self {
        DeleteDefinitionError::Infrastructure(err)
    }
}

impl From<StructureViolation> for DeleteDefinitionError {
    fn from(violation: StructureViolation) -> Self {
        DeleteDefinitionError::Violation(violation)
    }
}

/// Handler for deleting programs, versions, cycles and cycle items.
pub struct DeleteDefinitionHandler {
    reader: Arc<dyn DefinitionReader>,
    repository: Arc<dyn DefinitionRepository>,
    assignments: Arc<dyn AssignmentRepository>,
}

impl DeleteDefinitionHandler {
    pub fn new(
        reader: Arc<dyn DefinitionReader>,
        repository: Arc<dyn DefinitionRepository>,
        assignments: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            reader,
            repository,
            assignments,
        }
    }

    pub async fn handle(
        &self,
        cmd: DeleteDefinitionCommand,
    ) -> Result<DeleteDefinitionResult, DeleteDefinitionError> {
        let not_found = DeleteDefinitionError::NotFound {
            kind: cmd.kind(),
            id: cmd.id(),
        };

        match cmd {
            DeleteDefinitionCommand::DeleteProgram(id) => {
                self.reader.find_program(&id).await?.ok_or(not_found)?;
                if self.repository.program_has_versions(&id).await? {
                    return Err(StructureViolation::HasVersions.into());
                }
                self.repository.delete_program(&id).await?;
            }
            DeleteDefinitionCommand::DeleteVersion(id) => {
                self.reader.find_version(&id).await?.ok_or(not_found)?;
                if self.repository.version_has_cycles(&id).await? {
                    return Err(StructureViolation::HasCycles.into());
                }
                self.repository.delete_version(&id).await?;
            }
            DeleteDefinitionCommand::DeleteCycle(id) => {
                self.reader.find_cycle(&id).await?.ok_or(not_found)?;
                // Only items block a cycle delete; assignments are not checked.
                if self.repository.cycle_has_items(&id).await? {
                    return Err(StructureViolation::HasItems.into());
                }
                self.repository.delete_cycle(&id).await?;
            }
            DeleteDefinitionCommand::DeleteCycleItem(id) => {
                let item = self.reader.find_cycle_item(&id).await?.ok_or(not_found)?;
                if self.assignments.exists_for_cycle(&item.cycle_id).await? {
                    return Err(StructureViolation::HasLinkedEnrollments.into());
                }
                self.repository.delete_cycle_item(&id).await?;
            }
        }

        tracing::info!(kind = %cmd.kind(), id = cmd.id(), "Curriculum definition deleted");

        Ok(DeleteDefinitionResult {
            kind: cmd.kind(),
            id: cmd.id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCurriculumStore;
    use crate::domain::curriculum::{
        CoursePattern, Cycle, CycleItem, NewAssignment, Program, Version,
    };
    use crate::domain::foundation::{LearnerId, Timestamp};

    async fn store() -> InMemoryCurriculumStore {
        let store = InMemoryCurriculumStore::new();
        store
            .save_program(&Program {
                id: ProgramId::new(1),
                name: "Nursing".to_string(),
                enabled: true,
                description: String::new(),
                created_at: Timestamp::from_unix_secs(0),
                modified_at: Timestamp::from_unix_secs(0),
            })
            .await
            .unwrap();
        store
            .save_version(&Version {
                id: VersionId::new(10),
                program_id: ProgramId::new(1),
                name: "2024".to_string(),
                description: String::new(),
                start: Timestamp::from_unix_secs(0),
                end: None,
            })
            .await
            .unwrap();
        store
            .save_cycle(&Cycle {
                id: CycleId::new(100),
                version_id: VersionId::new(10),
                name: "Core".to_string(),
                description: String::new(),
                duration_days: 90,
                stage: 1,
            })
            .await
            .unwrap();
        store
            .save_cycle_item(&CycleItem {
                id: CycleItemId::new(1000),
                cycle_id: CycleId::new(100),
                course_code: CoursePattern::new("BIO-%").unwrap(),
                group_template: None,
                conditions: None,
                validity_days: 365,
            })
            .await
            .unwrap();
        store
    }

    fn handler(store: &InMemoryCurriculumStore) -> DeleteDefinitionHandler {
        DeleteDefinitionHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn program_with_versions_is_protected() {
        let store = store().await;

        let err = handler(&store)
            .handle(DeleteDefinitionCommand::DeleteProgram(ProgramId::new(1)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeleteDefinitionError::Violation(StructureViolation::HasVersions)
        ));
        assert!(store.find_program(&ProgramId::new(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn version_with_cycles_is_protected() {
        let store = store().await;

        let err = handler(&store)
            .handle(DeleteDefinitionCommand::DeleteVersion(VersionId::new(10)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeleteDefinitionError::Violation(StructureViolation::HasCycles)
        ));
    }

    #[tokio::test]
    async fn cycle_with_items_is_protected_with_readable_message() {
        let store = store().await;

        let err = handler(&store)
            .handle(DeleteDefinitionCommand::DeleteCycle(CycleId::new(100)))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::StructureViolation);
        assert_eq!(
            err.to_string(),
            "Cannot delete cycle because it has associated items. Please delete the items first."
        );
    }

    #[tokio::test]
    async fn item_with_assigned_learners_is_protected() {
        let store = store().await;
        store
            .seed_assignment(NewAssignment {
                cycle_id: CycleId::new(100),
                learner_id: LearnerId::new(7),
                start: Timestamp::from_unix_secs(0),
            })
            .await;

        let err = handler(&store)
            .handle(DeleteDefinitionCommand::DeleteCycleItem(CycleItemId::new(1000)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeleteDefinitionError::Violation(StructureViolation::HasLinkedEnrollments)
        ));
    }

    #[tokio::test]
    async fn leaf_first_deletion_succeeds() {
        let store = store().await;
        let handler = handler(&store);

        for cmd in [
            DeleteDefinitionCommand::DeleteCycleItem(CycleItemId::new(1000)),
            DeleteDefinitionCommand::DeleteCycle(CycleId::new(100)),
            DeleteDefinitionCommand::DeleteVersion(VersionId::new(10)),
            DeleteDefinitionCommand::DeleteProgram(ProgramId::new(1)),
        ] {
            let result = handler.handle(cmd).await.unwrap();
            assert_eq!(result.kind, cmd.kind());
        }

        assert!(store.list_programs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let store = store().await;

        let err = handler(&store)
            .handle(DeleteDefinitionCommand::DeleteCycle(CycleId::new(404)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeleteDefinitionError::NotFound {
                kind: DefinitionKind::Cycle,
                id: 404
            }
        ));
        assert_eq!(err.code(), ErrorCode::CycleNotFound);
    }
}
