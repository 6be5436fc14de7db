//! Definition repository port (write side).
//!
//! Administrative persistence for curriculum definitions. Saves are
//! upserts keyed by the definition's id. Deletes do not cascade; callers
//! check for children first.

use async_trait::async_trait;

use crate::domain::curriculum::{Cycle, CycleItem, Program, Version};
use crate::domain::foundation::{CycleId, CycleItemId, DomainError, ProgramId, VersionId};

/// Repository port for curriculum definitions.
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    /// Insert or replace a program.
    async fn save_program(&self, program: &Program) -> Result<(), DomainError>;

    /// Insert or replace a version.
    async fn save_version(&self, version: &Version) -> Result<(), DomainError>;

    /// Insert or replace a cycle.
    async fn save_cycle(&self, cycle: &Cycle) -> Result<(), DomainError>;

    /// Insert or replace a cycle item.
    async fn save_cycle_item(&self, item: &CycleItem) -> Result<(), DomainError>;

    /// Delete a program.
    ///
    /// # Errors
    ///
    /// - `ProgramNotFound` if the program doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn delete_program(&self, id: &ProgramId) -> Result<(), DomainError>;

    /// Delete a version.
    ///
    /// # Errors
    ///
    /// - `VersionNotFound` if the version doesn't exist
    async fn delete_version(&self, id: &VersionId) -> Result<(), DomainError>;

    /// Delete a cycle.
    ///
    /// # Errors
    ///
    /// - `CycleNotFound` if the cycle doesn't exist
    async fn delete_cycle(&self, id: &CycleId) -> Result<(), DomainError>;

    /// Delete a cycle item.
    ///
    /// # Errors
    ///
    /// - `CycleItemNotFound` if the item doesn't exist
    async fn delete_cycle_item(&self, id: &CycleItemId) -> Result<(), DomainError>;

    /// True if any version belongs to the program.
    async fn program_has_versions(&self, id: &ProgramId) -> Result<bool, DomainError>;

    /// True if any cycle belongs to the version.
    async fn version_has_cycles(&self, id: &VersionId) -> Result<bool, DomainError>;

    /// True if any item belongs to the cycle.
    async fn cycle_has_items(&self, id: &CycleId) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn DefinitionRepository) {}
    }
}
