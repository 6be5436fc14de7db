//! EventPublisher port.
//!
//! The progression operator announces assignment changes here without
//! knowing which transport carries them.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Outbound side of the event bus.
///
/// Delivery is at-least-once; subscribers must tolerate duplicates. An
/// error means at least one subscriber failed, not that the event was lost.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventPublisher) {}
}
