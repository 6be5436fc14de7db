//! Referential rules for deleting curriculum definitions.
//!
//! Definitions are removed leaf-first: a parent may only go once nothing
//! hangs off it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};

/// Kind of definition being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Program,
    Version,
    Cycle,
    CycleItem,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DefinitionKind::Program => "program",
            DefinitionKind::Version => "version",
            DefinitionKind::Cycle => "cycle",
            DefinitionKind::CycleItem => "cycle item",
        };
        write!(f, "{}", s)
    }
}

/// Why a delete was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureViolation {
    /// Program still has versions.
    HasVersions,
    /// Version still has cycles.
    HasCycles,
    /// Cycle still has items.
    HasItems,
    /// Assignments exist for the item's cycle.
    HasLinkedEnrollments,
}

impl StructureViolation {
    /// Message shown to administrators.
    pub fn message(&self) -> &'static str {
        match self {
            StructureViolation::HasVersions => {
                "Cannot delete program because it has associated versions. Please delete the versions first."
            }
            StructureViolation::HasCycles => {
                "Cannot delete version because it has associated cycles. Please delete the cycles first."
            }
            StructureViolation::HasItems => {
                "Cannot delete cycle because it has associated items. Please delete the items first."
            }
            StructureViolation::HasLinkedEnrollments => {
                "Cannot delete cycle item because learners are assigned to its cycle."
            }
        }
    }
}

impl fmt::Display for StructureViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<StructureViolation> for DomainError {
    fn from(violation: StructureViolation) -> Self {
        DomainError::new(ErrorCode::StructureViolation, violation.message())
            .with_detail("violation", format!("{:?}", violation))
    }
}
