//! Clock port.
//!
//! Every decision in the engine is taken against a single instant read
//! from this port, so tests can pin time.

use crate::domain::foundation::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
