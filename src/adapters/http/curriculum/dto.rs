//! HTTP DTOs for curriculum endpoints.
//!
//! Requests carry profile attributes as the host platform stores them
//! (free text or numbers, one per program attribute); parsing into domain
//! types happens here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::application::DeleteDefinitionResult;
use crate::domain::curriculum::{ActiveCycle, ProfileEvent};
use crate::domain::foundation::{DomainError, LearnerId, Timestamp};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// A profile event as posted by the host platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileEventRequest {
    ProfileChanged {
        learner_id: i64,
        /// Attribute values before the change.
        #[serde(default)]
        previous_programs: Vec<JsonValue>,
        /// Every program attribute value the profile now holds.
        declared_programs: Vec<JsonValue>,
    },
    LearnerDeleted {
        learner_id: i64,
    },
}

/// Raw attribute text; numbers are accepted as their decimal form.
fn attribute_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attribute_texts(values: &[JsonValue]) -> Vec<Option<String>> {
    values.iter().map(attribute_text).collect()
}

impl ProfileEventRequest {
    /// Converts the request into a domain event.
    ///
    /// # Errors
    ///
    /// Returns a bad request response when the learner id is not positive.
    pub fn into_event(self) -> Result<ProfileEvent, ErrorResponse> {
        let learner = match &self {
            ProfileEventRequest::ProfileChanged { learner_id, .. }
            | ProfileEventRequest::LearnerDeleted { learner_id } => *learner_id,
        };
        if learner <= 0 {
            return Err(ErrorResponse::bad_request(format!(
                "learner_id must be positive, got {}",
                learner
            )));
        }
        let learner_id = LearnerId::new(learner);

        Ok(match self {
            ProfileEventRequest::ProfileChanged {
                previous_programs,
                declared_programs,
                ..
            } => {
                let previous = attribute_texts(&previous_programs);
                let declared = attribute_texts(&declared_programs);
                ProfileEvent::changed(
                    learner_id,
                    previous.iter().map(Option::as_deref),
                    declared.iter().map(Option::as_deref),
                )
            }
            ProfileEventRequest::LearnerDeleted { .. } => {
                ProfileEvent::LearnerDeleted { learner_id }
            }
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for liveness checks.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Response for an accepted profile event.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileEventAccepted {
    pub learner_id: LearnerId,
    pub event: &'static str,
}

/// One active cycle for a learner.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveCycleResponse {
    pub cycle_id: i64,
    pub name: String,
    pub stage: i32,
    pub activation_time: Timestamp,
    /// Open assignment, if the learner already holds one.
    pub assignment_id: Option<i64>,
}

impl From<ActiveCycle> for ActiveCycleResponse {
    fn from(active: ActiveCycle) -> Self {
        Self {
            cycle_id: active.cycle.id.as_i64(),
            name: active.cycle.name,
            stage: active.cycle.stage,
            activation_time: active.activation_time,
            assignment_id: active.assignment.map(|a| a.id().as_i64()),
        }
    }
}

/// Response for a successful delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub kind: String,
    pub id: i64,
    pub message: String,
}

impl From<DeleteDefinitionResult> for DeleteResponse {
    fn from(result: DeleteDefinitionResult) -> Self {
        Self {
            kind: result.kind.to_string(),
            id: result.id,
            message: format!("The {} was deleted", result.kind),
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message)
    }
}

impl From<&DomainError> for ErrorResponse {
    fn from(err: &DomainError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, ProgramId};

    #[test]
    fn profile_change_accepts_text_and_numbers() {
        let json = r#"{"type": "profile_changed", "learner_id": 5, "previous_programs": ["3"], "declared_programs": [4, "3", null]}"#;
        let req: ProfileEventRequest = serde_json::from_str(json).unwrap();

        let event = req.into_event().unwrap();

        match event {
            ProfileEvent::ProfileChanged {
                previous_programs,
                declared_programs,
                ..
            } => {
                assert!(previous_programs.contains(&ProgramId::new(3)));
                assert!(declared_programs.contains(&ProgramId::new(3)));
                assert!(declared_programs.contains(&ProgramId::new(4)));
                assert_eq!(declared_programs.as_set().len(), 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn empty_declared_list_means_no_program() {
        let json = r#"{"type": "profile_changed", "learner_id": 5, "declared_programs": []}"#;
        let req: ProfileEventRequest = serde_json::from_str(json).unwrap();

        assert_eq!(
            req.into_event().unwrap(),
            ProfileEvent::changed(LearnerId::new(5), [], [])
        );
    }

    #[test]
    fn declared_list_is_required() {
        let json = r#"{"type": "profile_changed", "learner_id": 5}"#;
        assert!(serde_json::from_str::<ProfileEventRequest>(json).is_err());
    }

    #[test]
    fn learner_deleted_deserializes() {
        let json = r#"{"type": "learner_deleted", "learner_id": 8}"#;
        let req: ProfileEventRequest = serde_json::from_str(json).unwrap();

        assert_eq!(
            req.into_event().unwrap(),
            ProfileEvent::LearnerDeleted {
                learner_id: LearnerId::new(8)
            }
        );
    }

    #[test]
    fn non_positive_learner_is_rejected() {
        let req = ProfileEventRequest::LearnerDeleted { learner_id: 0 };

        let err = req.into_event().unwrap_err();

        assert_eq!(err.code, "BAD_REQUEST");
    }

    #[test]
    fn error_response_copies_domain_error() {
        let err = DomainError::new(ErrorCode::CycleNotFound, "Cycle not found: 4")
            .with_detail("cycle_id", "4");

        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();

        assert_eq!(body["code"], "CYCLE_NOT_FOUND");
        assert_eq!(body["details"]["cycle_id"], "4");
    }

    #[test]
    fn empty_details_are_omitted() {
        let body = serde_json::to_value(ErrorResponse::not_found("gone")).unwrap();
        assert!(body.get("details").is_none());
    }
}
