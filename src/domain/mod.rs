//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, events)
//! - `curriculum` - Curriculum definitions, assignments and activation math

pub mod curriculum;
pub mod foundation;
