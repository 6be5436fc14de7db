//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Store Ports
//!
//! - `DefinitionReader` - Programs, versions, cycles and items (read side)
//! - `DefinitionRepository` - Administrative writes and child checks
//! - `AssignmentRepository` - Assignment queries and insert-if-absent
//!
//! ## Platform Ports
//!
//! - `EnrollmentBridge` - Course resolution and enrollment
//! - `Clock` - Current time
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` - Port for subscribing to domain events
//! - `EventHandler` - Handler that processes published events
//! - `ProfileEventHandler` - Typed handler for learner profile events

mod assignment_repository;
mod clock;
mod definition_reader;
mod definition_repository;
mod enrollment_bridge;
mod event_publisher;
mod event_subscriber;
mod profile_event_handler;

pub use assignment_repository::{AssignmentRepository, InsertOutcome, ProgramAssignment};
pub use clock::Clock;
pub use definition_reader::DefinitionReader;
pub use definition_repository::DefinitionRepository;
pub use enrollment_bridge::{
    Course, EnrollmentBridge, EnrollmentError, EnrollmentOutcome, EnrollmentRequest,
};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventHandler, EventSubscriber};
pub use profile_event_handler::ProfileEventHandler;
