//! HTTP adapter for the curriculum engine.
//!
//! Exposes learner progress queries, administrative deletes, manual sweeps
//! and the profile event intake.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::CurriculumAppState;
pub use routes::curriculum_router;
