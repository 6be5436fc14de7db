//! In-memory adapters for tests and single-process runs.

mod curriculum_store;
mod enrollment_bridge;

pub use curriculum_store::InMemoryCurriculumStore;
pub use enrollment_bridge::{EnrollmentRecord, InMemoryEnrollmentBridge};
