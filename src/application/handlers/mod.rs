//! Application handlers.
//!
//! Administrative command and query handlers over curriculum definitions.

mod delete_definition;
mod get_curriculum_tree;

pub use delete_definition::{
    DeleteDefinitionCommand, DeleteDefinitionError, DeleteDefinitionHandler,
    DeleteDefinitionResult,
};
pub use get_curriculum_tree::{
    CurriculumTree, CycleNode, GetCurriculumTreeError, GetCurriculumTreeHandler,
    GetCurriculumTreeQuery, VersionNode,
};
