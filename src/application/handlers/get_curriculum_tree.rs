//! GetCurriculumTreeHandler - Query handler for a program's full structure.
//!
//! Returns program → versions (by start) → cycles (by stage, name) → items,
//! flagging the version in force at query time.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::curriculum::{select_active_version, Cycle, CycleItem, Program, Version};
use crate::domain::foundation::{DomainError, ProgramId};
use crate::ports::{Clock, DefinitionReader};

/// Query to get the curriculum tree of a program.
#[derive(Debug, Clone, Copy)]
pub struct GetCurriculumTreeQuery {
    pub program_id: ProgramId,
}

/// A cycle with its items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleNode {
    #[serde(flatten)]
    pub cycle: Cycle,
    pub items: Vec<CycleItem>,
}

/// A version with its cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionNode {
    #[serde(flatten)]
    pub version: Version,
    /// True for the version in force at query time.
    pub active: bool,
    pub cycles: Vec<CycleNode>,
}

/// Full curriculum structure of one program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurriculumTree {
    pub program: Program,
    pub versions: Vec<VersionNode>,
}

/// Error type for the tree query.
#[derive(Debug, Clone)]
pub enum GetCurriculumTreeError {
    /// The program doesn't exist.
    ProgramNotFound(ProgramId),
    /// Infrastructure error.
    Infrastructure(DomainError),
}

impl std::fmt::Display for GetCurriculumTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GetCurriculumTreeError::ProgramNotFound(id) => write!(f, "Program not found: {}", id),
            GetCurriculumTreeError::Infrastructure(err) => {
                write!(f, "Infrastructure error: {}", err)
            }
        }
    }
}

impl std::error::Error for GetCurriculumTreeError {}

impl From<DomainError> for GetCurriculumTreeError {
    fn from(err: DomainError) -> Self {
        GetCurriculumTreeError::Infrastructure(err)
    }
}

/// Handler for the curriculum tree query.
pub struct GetCurriculumTreeHandler {
    reader: Arc<dyn DefinitionReader>,
    clock: Arc<dyn Clock>,
}

impl GetCurriculumTreeHandler {
    pub fn new(reader: Arc<dyn DefinitionReader>, clock: Arc<dyn Clock>) -> Self {
        Self { reader, clock }
    }

    pub async fn handle(
        &self,
        query: GetCurriculumTreeQuery,
    ) -> Result<CurriculumTree, GetCurriculumTreeError> {
        let program = self
            .reader
            .find_program(&query.program_id)
            .await?
            .ok_or(GetCurriculumTreeError::ProgramNotFound(query.program_id))?;

        let versions = self.reader.versions_by_program(&program.id).await?;
        let active_id = select_active_version(&versions, self.clock.now()).map(|v| v.id);

        let mut version_nodes = Vec::with_capacity(versions.len());
        for version in versions {
            let mut cycle_nodes = Vec::new();
            for cycle in self.reader.cycles_by_version(&version.id).await? {
                let items = self.reader.items_by_cycle(&cycle.id).await?;
                cycle_nodes.push(CycleNode { cycle, items });
            }
            version_nodes.push(VersionNode {
                active: Some(version.id) == active_id,
                version,
                cycles: cycle_nodes,
            });
        }

        Ok(CurriculumTree {
            program,
            versions: version_nodes,
        })
    }
}
