//! Domain event plumbing.
//!
//! Events are plain serde structs tagged with [`DomainEvent`]; publishing
//! wraps them in an [`EventEnvelope`] whose `event_type` ends in a `.vN`
//! schema suffix.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Identity and routing data every published event carries.
pub trait DomainEvent: Send + Sync {
    /// Routing key, e.g. `cycle.assigned.v1`.
    fn event_type(&self) -> &'static str;

    fn aggregate_id(&self) -> String;

    /// e.g. `Assignment`.
    fn aggregate_type(&self) -> &'static str;

    fn occurred_at(&self) -> Timestamp;

    fn event_id(&self) -> EventId;
}

/// Blanket envelope conversion for events that serialize.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    fn to_envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        let event_type = self.event_type();
        Ok(EventEnvelope {
            event_id: self.event_id(),
            event_type: event_type.to_string(),
            schema_version: schema_version_of(event_type),
            aggregate_id: self.aggregate_id(),
            aggregate_type: self.aggregate_type().to_string(),
            occurred_at: self.occurred_at(),
            payload: serde_json::to_value(self)?,
        })
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// Implements [`DomainEvent`] by naming the fields that hold each value.
///
/// ```ignore
/// domain_event!(
///     AssignmentClosed,
///     event_type = "assignment.closed.v1",
///     aggregate_id = assignment_id,
///     aggregate_type = "Assignment",
///     occurred_at = closed_at,
///     event_id = event_id
/// );
/// ```
#[macro_export]
macro_rules! domain_event {
    (
        $event_name:ident,
        event_type = $event_type:expr,
        aggregate_id = $agg_id_field:ident,
        aggregate_type = $agg_type:expr,
        occurred_at = $occurred_field:ident,
        event_id = $event_id_field:ident
    ) => {
        impl $crate::domain::foundation::DomainEvent for $event_name {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn aggregate_id(&self) -> String {
                self.$agg_id_field.to_string()
            }

            fn aggregate_type(&self) -> &'static str {
                $agg_type
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$occurred_field
            }

            fn event_id(&self) -> $crate::domain::foundation::EventId {
                self.$event_id_field.clone()
            }
        }
    };
}

pub use domain_event;

/// Unique id of one published event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Random UUID v4 id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `.vN` suffix of an event type; 1 when absent or unreadable.
fn schema_version_of(event_type: &str) -> u32 {
    event_type
        .rsplit_once(".v")
        .and_then(|(_, n)| n.parse().ok())
        .unwrap_or(1)
}

/// A serialized event on its way to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: u32,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
}

impl EventEnvelope {
    /// Builds an envelope from an already serialized payload, stamped now.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        let event_type = event_type.into();
        Self {
            event_id: EventId::new(),
            schema_version: schema_version_of(&event_type),
            event_type,
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            occurred_at: Timestamp::now(),
            payload,
        }
    }

    /// Decodes the payload back into a concrete event.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct SampleClosed {
        event_id: EventId,
        assignment_id: i64,
        closed_at: Timestamp,
    }

    domain_event!(
        SampleClosed,
        event_type = "sample.closed.v2",
        aggregate_id = assignment_id,
        aggregate_type = "Assignment",
        occurred_at = closed_at,
        event_id = event_id
    );

    #[test]
    fn event_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn schema_version_comes_from_suffix() {
        assert_eq!(schema_version_of("cycle.assigned.v1"), 1);
        assert_eq!(schema_version_of("cycle.assigned.v12"), 12);
        assert_eq!(schema_version_of("legacy.event"), 1);
    }

    #[test]
    fn new_envelope_reads_version() {
        let envelope = EventEnvelope::new("assignment.closed.v3", "4", "Assignment", json!({}));
        assert_eq!(envelope.schema_version, 3);
    }

    #[test]
    fn to_envelope_copies_event_fields() {
        let event = SampleClosed {
            event_id: EventId::from_string("evt-9"),
            assignment_id: 31,
            closed_at: Timestamp::from_unix_secs(1_700_000_000),
        };

        let envelope = event.to_envelope().unwrap();

        assert_eq!(envelope.event_type, "sample.closed.v2");
        assert_eq!(envelope.schema_version, 2);
        assert_eq!(envelope.aggregate_id, "31");
        assert_eq!(envelope.aggregate_type, "Assignment");
        assert_eq!(envelope.event_id.as_str(), "evt-9");

        let back: SampleClosed = envelope.payload_as().unwrap();
        assert_eq!(back.assignment_id, 31);
    }
}
