//! Program and version definitions.
//!
//! A program is the top-level curriculum. Each program is instantiated by
//! one or more time-bounded versions; at any instant at most one version is
//! the program's *active* version.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProgramId, Timestamp, VersionId};

/// Top-level curriculum definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    /// Disabled programs are skipped by the sweep.
    pub enabled: bool,
    pub description: String,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

/// A time-bounded instantiation of a program's curriculum plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub program_id: ProgramId,
    pub name: String,
    pub description: String,
    pub start: Timestamp,
    /// `None` means open-ended.
    pub end: Option<Timestamp>,
}

impl Version {
    /// Whether this version is in force at `at`.
    ///
    /// Active iff `start <= at` and the version is open-ended or ends
    /// strictly after `at`.
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        if self.start.is_after(&at) {
            return false;
        }
        match self.end {
            None => true,
            Some(end) => end.is_after(&at),
        }
    }
}

/// Picks the active version among a program's versions.
///
/// When several versions qualify the one with the latest start wins.
/// Equal starts fall back to the higher id so the choice is stable.
pub fn select_active_version<'a, I>(versions: I, at: Timestamp) -> Option<&'a Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    versions
        .into_iter()
        .filter(|v| v.is_active_at(at))
        .max_by_key(|v| (v.start, v.id))
}
