//! Curriculum Engine - time-gated cycle activation for academic programs.
//!
//! Programs have dated versions; each version orders cycles by stage and
//! gives each a duration. A learner's cycles unlock one after another from
//! the moment they were first assigned, and every newly assigned cycle
//! enrolls the learner in the courses it lists.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
