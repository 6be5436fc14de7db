//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `clock` - System and fixed clocks
//! - `events` - In-process event bus, audit log, profile event queue
//! - `http` - REST API (axum)
//! - `memory` - In-memory stores for tests and single-process runs
//! - `postgres` - PostgreSQL stores and the platform enrollment bridge
//! - `scheduler` - Periodic activation sweep

pub mod clock;
pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod scheduler;

pub use clock::{FixedClock, SystemClock};
pub use events::{
    profile_channel, AssignmentAuditLog, InMemoryEventBus, ProfileEventDispatcher,
    ProfileEventSender, ProfileEventWorker, RetryPolicy,
};
pub use scheduler::{SweepScheduler, SweepSchedulerConfig};
