//! Typed subscriber port for learner profile events.
//!
//! The host platform announces profile changes and learner deletions.
//! Handlers receive the parsed `ProfileEvent` rather than a raw envelope.

use async_trait::async_trait;

use crate::domain::curriculum::ProfileEvent;
use crate::domain::foundation::DomainError;

/// Handler for learner profile events.
///
/// Handlers must tolerate redelivery of the same event.
#[async_trait]
pub trait ProfileEventHandler: Send + Sync {
    /// Process one profile event.
    async fn handle(&self, event: &ProfileEvent) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}
