//! Curriculum domain module.
//!
//! Programs, versions, cycles and cycle items describe the curriculum;
//! assignments record which learner occupies which cycle. The timeline
//! module holds the activation arithmetic that decides when each stage
//! opens for a learner.
//!
//! # Events
//!
//! - `CycleAssigned` - Published when a learner is assigned to a cycle
//! - `AssignmentClosed` - Published when an assignment is ended

mod assignment;
mod cycle;
mod events;
mod profile;
mod program;
mod structure;
mod timeline;

pub use assignment::{Assignment, AssignmentStatus, EndReason, NewAssignment};
pub use cycle::{
    first_in_stage_order, sort_by_stage, CoursePattern, Cycle, CycleItem, COURSE_CODE_WILDCARD,
};
pub use events::{AssignmentClosed, CycleAssigned};
pub use profile::{DeclaredPrograms, ProfileEvent, ProgramAttribute};
pub use program::{select_active_version, Program, Version};
pub use structure::{DefinitionKind, StructureViolation};
pub use timeline::{
    active_cycles, activation_times, index_by_cycle, learner_timeline, ActiveCycle, CycleProgress,
    CycleState, LearnerTimeline,
};
