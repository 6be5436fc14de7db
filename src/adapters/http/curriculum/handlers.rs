//! HTTP handlers for curriculum endpoints.
//!
//! These handlers connect Axum routes to the resolver, the sweep task, the
//! profile event queue and the administrative handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::events::ProfileEventSender;
use crate::application::{
    CurriculumResolver, DeleteDefinitionCommand, DeleteDefinitionError, DeleteDefinitionHandler,
    GetCurriculumTreeError, GetCurriculumTreeHandler, GetCurriculumTreeQuery, ResolutionContext,
    SweepTask,
};
use crate::domain::foundation::{
    CycleId, CycleItemId, DomainError, ErrorCode, LearnerId, ProgramId, VersionId,
};
use crate::ports::{Clock, DefinitionReader};

use super::dto::{
    ActiveCycleResponse, DeleteResponse, ErrorResponse, HealthResponse, ProfileEventAccepted,
    ProfileEventRequest,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
#[derive(Clone)]
pub struct CurriculumAppState {
    pub resolver: Arc<CurriculumResolver>,
    pub definitions: Arc<dyn DefinitionReader>,
    pub sweep: Arc<SweepTask>,
    pub profile_events: ProfileEventSender,
    pub tree_handler: Arc<GetCurriculumTreeHandler>,
    pub delete_handler: Arc<DeleteDefinitionHandler>,
    pub clock: Arc<dyn Clock>,
}

impl CurriculumAppState {
    fn context(&self) -> ResolutionContext {
        ResolutionContext::from_clock(self.clock.as_ref())
    }

    async fn require_program(&self, program_id: ProgramId) -> Result<(), CurriculumApiError> {
        match self.definitions.find_program(&program_id).await? {
            Some(_) => Ok(()),
            None => Err(CurriculumApiError::NotFound(DomainError::new(
                ErrorCode::ProgramNotFound,
                format!("Program not found: {}", program_id),
            ))),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Health and Operations
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/profile-events - Queue a profile change for processing
pub async fn submit_profile_event(
    State(state): State<CurriculumAppState>,
    Json(request): Json<ProfileEventRequest>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    let event = request.into_event().map_err(CurriculumApiError::BadRequest)?;
    let accepted = ProfileEventAccepted {
        learner_id: event.learner_id(),
        event: event.kind(),
    };

    state
        .profile_events
        .send(event)
        .await
        .map_err(CurriculumApiError::Unavailable)?;

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// POST /api/sweep - Run one activation sweep now
pub async fn run_sweep(
    State(state): State<CurriculumAppState>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    let report = state.sweep.run().await?;
    Ok(Json(report))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/programs/:id/tree - Program structure with the active version flagged
pub async fn get_curriculum_tree(
    State(state): State<CurriculumAppState>,
    Path(program_id): Path<i64>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    let query = GetCurriculumTreeQuery {
        program_id: ProgramId::new(program_id),
    };
    let tree = state.tree_handler.handle(query).await?;
    Ok(Json(tree))
}

/// GET /api/programs/:id/learners/:learner_id/active-cycles
pub async fn get_active_cycles(
    State(state): State<CurriculumAppState>,
    Path((program_id, learner_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    let program_id = ProgramId::new(program_id);
    state.require_program(program_id).await?;

    let ctx = state.context();
    let active = state
        .resolver
        .user_active_cycles(&ctx, &program_id, &LearnerId::new(learner_id))
        .await?;

    let response: Vec<ActiveCycleResponse> = active.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// GET /api/programs/:id/learners/:learner_id/timeline
pub async fn get_learner_timeline(
    State(state): State<CurriculumAppState>,
    Path((program_id, learner_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    let program_id = ProgramId::new(program_id);
    let learner_id = LearnerId::new(learner_id);
    state.require_program(program_id).await?;

    let ctx = state.context();
    let timeline = state
        .resolver
        .learner_timeline(&ctx, &program_id, &learner_id)
        .await?
        .ok_or_else(|| {
            CurriculumApiError::NotFound(
                DomainError::new(
                    ErrorCode::AssignmentNotFound,
                    format!(
                        "Learner {} has never been assigned in program {}",
                        learner_id, program_id
                    ),
                )
                .with_detail("learner_id", learner_id.to_string()),
            )
        })?;

    Ok(Json(timeline))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (DELETE endpoints)
// ════════════════════════════════════════════════════════════════════════════════

async fn delete_definition(
    state: &CurriculumAppState,
    cmd: DeleteDefinitionCommand,
) -> Result<Json<DeleteResponse>, CurriculumApiError> {
    let result = state.delete_handler.handle(cmd).await?;
    Ok(Json(result.into()))
}

/// DELETE /api/programs/:id
pub async fn delete_program(
    State(state): State<CurriculumAppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    delete_definition(&state, DeleteDefinitionCommand::DeleteProgram(ProgramId::new(id))).await
}

/// DELETE /api/versions/:id
pub async fn delete_version(
    State(state): State<CurriculumAppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    delete_definition(&state, DeleteDefinitionCommand::DeleteVersion(VersionId::new(id))).await
}

/// DELETE /api/cycles/:id
pub async fn delete_cycle(
    State(state): State<CurriculumAppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    delete_definition(&state, DeleteDefinitionCommand::DeleteCycle(CycleId::new(id))).await
}

/// DELETE /api/cycle-items/:id
pub async fn delete_cycle_item(
    State(state): State<CurriculumAppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CurriculumApiError> {
    delete_definition(
        &state,
        DeleteDefinitionCommand::DeleteCycleItem(CycleItemId::new(id)),
    )
    .await
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub enum CurriculumApiError {
    BadRequest(ErrorResponse),
    NotFound(DomainError),
    Conflict(ErrorResponse),
    Unavailable(DomainError),
    Internal(DomainError),
}

impl From<DomainError> for CurriculumApiError {
    fn from(err: DomainError) -> Self {
        if err.code.is_not_found() {
            CurriculumApiError::NotFound(err)
        } else if err.code == ErrorCode::ValidationFailed {
            CurriculumApiError::BadRequest(ErrorResponse::from(&err))
        } else {
            CurriculumApiError::Internal(err)
        }
    }
}

impl From<GetCurriculumTreeError> for CurriculumApiError {
    fn from(err: GetCurriculumTreeError) -> Self {
        match err {
            GetCurriculumTreeError::ProgramNotFound(id) => CurriculumApiError::NotFound(
                DomainError::new(ErrorCode::ProgramNotFound, format!("Program not found: {}", id)),
            ),
            GetCurriculumTreeError::Infrastructure(e) => e.into(),
        }
    }
}

impl From<DeleteDefinitionError> for CurriculumApiError {
    fn from(err: DeleteDefinitionError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            DeleteDefinitionError::NotFound { id, .. } => CurriculumApiError::NotFound(
                DomainError::new(code, message).with_detail("id", id.to_string()),
            ),
            DeleteDefinitionError::Violation(_) => {
                CurriculumApiError::Conflict(ErrorResponse::new(code.to_string(), message))
            }
            DeleteDefinitionError::Infrastructure(e) => e.into(),
        }
    }
}

impl IntoResponse for CurriculumApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            CurriculumApiError::BadRequest(body) => (StatusCode::BAD_REQUEST, body),
            CurriculumApiError::NotFound(err) => (StatusCode::NOT_FOUND, ErrorResponse::from(&err)),
            CurriculumApiError::Conflict(body) => (StatusCode::CONFLICT, body),
            CurriculumApiError::Unavailable(err) => {
                tracing::warn!(error = %err, "Profile event queue unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::unavailable(err.message),
                )
            }
            CurriculumApiError::Internal(err) => {
                tracing::error!(code = %err.code, error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::from(&err))
            }
        };

        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::curriculum::StructureViolation;

    fn status_of(err: CurriculumApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_codes_map_to_404() {
        let err = DomainError::new(ErrorCode::CycleNotFound, "Cycle not found: 3");
        assert_eq!(status_of(err.into()), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let err = DomainError::validation("duration_days", "must not be negative");
        assert_eq!(status_of(err.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_errors_map_to_500() {
        let err = DomainError::new(ErrorCode::DatabaseError, "connection reset");
        assert_eq!(status_of(err.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn structure_violation_maps_to_409() {
        let err = DeleteDefinitionError::Violation(StructureViolation::HasVersions);
        assert_eq!(status_of(err.into()), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_program_in_tree_query_maps_to_404() {
        let err = GetCurriculumTreeError::ProgramNotFound(ProgramId::new(9));
        assert_eq!(status_of(err.into()), StatusCode::NOT_FOUND);
    }
}
