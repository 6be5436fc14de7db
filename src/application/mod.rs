//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//!
//! - `CurriculumResolver` - read-side decisions (active versions, active cycles)
//! - `ProgressionOperator` - the only writer of assignments
//! - `SweepTask` - periodic activation of due cycles
//! - `ProfileEventAdapter` - reacts to learner profile changes
//! - `handlers` - administrative commands and queries

mod context;
pub mod handlers;
mod profile;
mod progression;
mod resolver;
mod sweep;

pub use context::ResolutionContext;
pub use handlers::{
    CurriculumTree, CycleNode, DeleteDefinitionCommand, DeleteDefinitionError,
    DeleteDefinitionHandler, DeleteDefinitionResult, GetCurriculumTreeError,
    GetCurriculumTreeHandler, GetCurriculumTreeQuery, VersionNode,
};
pub use profile::{ProfileEventAdapter, ProfileSyncOutcome};
pub use progression::{
    AssignOutcome, AssignmentLocks, EnrollmentSettings, ProgressionError, ProgressionOperator,
};
pub use resolver::CurriculumResolver;
pub use sweep::{SweepReport, SweepTask};
