//! HTTP adapters - REST API implementations.
//!
//! [`build_app_router`] wraps the curriculum routes in the shared
//! middleware stack so the binary and tests serve the same thing.

pub mod curriculum;

use std::time::Duration;

use axum::http::HeaderName;
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use curriculum::{curriculum_router, CurriculumAppState};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the full application router.
///
/// Layers run outermost first: request id assignment, tracing, request id
/// propagation to the response, then the timeout.
pub fn build_app_router(state: CurriculumAppState, request_timeout: Duration) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    curriculum_router()
        .layer(TimeoutLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}
