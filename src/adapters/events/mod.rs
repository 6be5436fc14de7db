//! Event adapters.
//!
//! - `InMemoryEventBus` - Synchronous, in-process bus for assignment events
//! - `AssignmentAuditLog` - Structured log line per assignment event
//! - `ProfileEventDispatcher` / `profile_channel` - Queued delivery of
//!   profile changes to their handlers

mod audit_log;
mod in_memory;
mod profile_channel;

pub use audit_log::AssignmentAuditLog;
pub use in_memory::InMemoryEventBus;
pub use profile_channel::{
    profile_channel, ProfileEventDispatcher, ProfileEventSender, ProfileEventWorker, RetryPolicy,
};
