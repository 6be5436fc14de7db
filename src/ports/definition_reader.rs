//! Definition reader port (read side).
//!
//! Read access to programs, versions, cycles and cycle items. The engine
//! never writes definitions on the hot path; administrative writes go
//! through `DefinitionRepository`.

use async_trait::async_trait;

use crate::domain::curriculum::{Cycle, CycleItem, Program, Version};
use crate::domain::foundation::{CycleId, CycleItemId, DomainError, ProgramId, VersionId};

/// Reader port for curriculum definitions.
#[async_trait]
pub trait DefinitionReader: Send + Sync {
    /// Find a program by ID. Returns `None` if not found.
    async fn find_program(&self, id: &ProgramId) -> Result<Option<Program>, DomainError>;

    /// List every program, ordered by id.
    async fn list_programs(&self) -> Result<Vec<Program>, DomainError>;

    /// Find a version by ID. Returns `None` if not found.
    async fn find_version(&self, id: &VersionId) -> Result<Option<Version>, DomainError>;

    /// Versions of a program ordered by start ascending.
    async fn versions_by_program(&self, program_id: &ProgramId)
        -> Result<Vec<Version>, DomainError>;

    /// Find a cycle by ID. Returns `None` if not found.
    async fn find_cycle(&self, id: &CycleId) -> Result<Option<Cycle>, DomainError>;

    /// Cycles of a version ordered by (stage, name).
    async fn cycles_by_version(&self, version_id: &VersionId) -> Result<Vec<Cycle>, DomainError>;

    /// Find a cycle item by ID. Returns `None` if not found.
    async fn find_cycle_item(&self, id: &CycleItemId) -> Result<Option<CycleItem>, DomainError>;

    /// Items attached to a cycle, ordered by id.
    async fn items_by_cycle(&self, cycle_id: &CycleId) -> Result<Vec<CycleItem>, DomainError>;
}
