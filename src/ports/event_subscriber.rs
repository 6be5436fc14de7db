//! EventSubscriber port.
//!
//! Handlers register for event types such as `cycle.assigned.v1`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Consumer of published events.
///
/// A failing handler does not stop delivery to the others.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Name used in logs and error messages.
    fn name(&self) -> &'static str;
}

/// Registration side of the event bus.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Registers one handler under several event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}
