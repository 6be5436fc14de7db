//! Route configuration for curriculum endpoints.

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers::{
    delete_cycle, delete_cycle_item, delete_program, delete_version, get_active_cycles,
    get_curriculum_tree, get_learner_timeline, health, run_sweep, submit_profile_event,
    CurriculumAppState,
};

/// Creates the curriculum router with all endpoints.
///
/// Routes:
/// - `GET /health` - Liveness check
/// - `POST /api/profile-events` - Queue a learner profile change
/// - `POST /api/sweep` - Run one activation sweep
/// - `GET /api/programs/:id/tree` - Program structure
/// - `GET /api/programs/:id/learners/:learner_id/active-cycles` - Active cycles
/// - `GET /api/programs/:id/learners/:learner_id/timeline` - Stage timeline
/// - `DELETE /api/programs/:id`, `/api/versions/:id`, `/api/cycles/:id`,
///   `/api/cycle-items/:id` - Remove definitions with nothing beneath them
pub fn curriculum_router() -> Router<CurriculumAppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/profile-events", post(submit_profile_event))
        .route("/api/sweep", post(run_sweep))
        .route("/api/programs/:id", delete(delete_program))
        .route("/api/programs/:id/tree", get(get_curriculum_tree))
        .route(
            "/api/programs/:id/learners/:learner_id/active-cycles",
            get(get_active_cycles),
        )
        .route(
            "/api/programs/:id/learners/:learner_id/timeline",
            get(get_learner_timeline),
        )
        .route("/api/versions/:id", delete(delete_version))
        .route("/api/cycles/:id", delete(delete_cycle))
        .route("/api/cycle-items/:id", delete(delete_cycle_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::events::{
        profile_channel, InMemoryEventBus, ProfileEventDispatcher, ProfileEventWorker,
    };
    use crate::adapters::memory::{InMemoryCurriculumStore, InMemoryEnrollmentBridge};
    use crate::application::{
        CurriculumResolver, DeleteDefinitionHandler, EnrollmentSettings,
        GetCurriculumTreeHandler, ProgressionOperator, SweepTask,
    };
    use crate::domain::curriculum::{Cycle, NewAssignment, Program, Version};
    use crate::domain::foundation::{CycleId, LearnerId, ProgramId, Timestamp, VersionId};
    use crate::ports::DefinitionRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn origin() -> Timestamp {
        Timestamp::from_unix_secs(1_709_251_200) // 2024-03-01
    }

    struct TestApp {
        router: Router,
        store: InMemoryCurriculumStore,
        // Held but never run, so queued events just sit in the channel.
        _worker: Option<ProfileEventWorker>,
    }

    async fn seeded_store() -> InMemoryCurriculumStore {
        let store = InMemoryCurriculumStore::new();
        store
            .save_program(&Program {
                id: ProgramId::new(1),
                name: "Nursing".to_string(),
                enabled: true,
                description: String::new(),
                created_at: origin(),
                modified_at: origin(),
            })
            .await
            .unwrap();
        store
            .save_version(&Version {
                id: VersionId::new(10),
                program_id: ProgramId::new(1),
                name: "2024".to_string(),
                description: String::new(),
                start: origin().minus_days(30),
                end: None,
            })
            .await
            .unwrap();
        for (id, stage, name, days) in [(101, 1, "Core", 90), (102, 2, "Clinical", 60)] {
            store
                .save_cycle(&Cycle {
                    id: CycleId::new(id),
                    version_id: VersionId::new(10),
                    name: name.to_string(),
                    description: String::new(),
                    duration_days: days,
                    stage,
                })
                .await
                .unwrap();
        }
        store
            .seed_assignment(NewAssignment {
                cycle_id: CycleId::new(101),
                learner_id: LearnerId::new(7),
                start: origin(),
            })
            .await;
        store
    }

    async fn test_app(now: Timestamp, keep_worker: bool) -> TestApp {
        let store = seeded_store().await;
        let clock = Arc::new(FixedClock::new(now));
        let resolver = Arc::new(CurriculumResolver::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        ));
        let operator = Arc::new(ProgressionOperator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(InMemoryEnrollmentBridge::new()),
            Arc::new(InMemoryEventBus::new()),
            resolver.clone(),
            EnrollmentSettings::default(),
        ));
        let sweep = Arc::new(SweepTask::new(
            resolver.clone(),
            operator,
            Arc::new(store.clone()),
            clock.clone(),
        ));
        let (sender, worker) = profile_channel(4, Arc::new(ProfileEventDispatcher::default()));
        let worker = keep_worker.then_some(worker);

        let state = CurriculumAppState {
            resolver,
            definitions: Arc::new(store.clone()),
            sweep,
            profile_events: sender,
            tree_handler: Arc::new(GetCurriculumTreeHandler::new(
                Arc::new(store.clone()),
                clock.clone(),
            )),
            delete_handler: Arc::new(DeleteDefinitionHandler::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(store.clone()),
            )),
            clock,
        };

        TestApp {
            router: curriculum_router().with_state(state),
            store,
            _worker: worker,
        }
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(app.router, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn active_cycles_include_activated_successor() {
        let app = test_app(origin().plus_days(100), true).await;

        let (status, body) = send(
            app.router,
            "GET",
            "/api/programs/1/learners/7/active-cycles",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let cycles = body.as_array().unwrap();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0]["name"], "Core");
        assert!(cycles[0]["assignment_id"].is_number());
        assert_eq!(cycles[1]["name"], "Clinical");
        assert!(cycles[1]["assignment_id"].is_null());
    }

    #[tokio::test]
    async fn active_cycles_for_unknown_program_is_404() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(
            app.router,
            "GET",
            "/api/programs/99/learners/7/active-cycles",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "PROGRAM_NOT_FOUND");
    }

    #[tokio::test]
    async fn unassigned_learner_has_no_active_cycles() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(
            app.router,
            "GET",
            "/api/programs/1/learners/8/active-cycles",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn timeline_lists_every_stage() {
        let app = test_app(origin().plus_days(10), true).await;

        let (status, body) =
            send(app.router, "GET", "/api/programs/1/learners/7/timeline", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cycles"].as_array().unwrap().len(), 2);
        assert!(body["next_activation"].is_string());
    }

    #[tokio::test]
    async fn timeline_for_never_assigned_learner_is_404() {
        let app = test_app(origin(), true).await;

        let (status, _) =
            send(app.router, "GET", "/api/programs/1/learners/8/timeline", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tree_returns_program_structure() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(app.router, "GET", "/api/programs/1/tree", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["program"]["name"], "Nursing");
        assert_eq!(body["versions"][0]["active"], true);
        assert_eq!(body["versions"][0]["cycles"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sweep_endpoint_creates_due_assignments() {
        let app = test_app(origin().plus_days(100), true).await;

        let (status, body) = send(app.router, "POST", "/api/sweep", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assignments_created"], 1);
        assert_eq!(app.store.assignment_count().await, 2);
    }

    #[tokio::test]
    async fn profile_event_is_accepted() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(
            app.router,
            "POST",
            "/api/profile-events",
            Some(r#"{"type": "profile_changed", "learner_id": 9, "declared_programs": ["1"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["event"], "profile_changed");
    }

    #[tokio::test]
    async fn profile_event_without_worker_is_503() {
        let app = test_app(origin(), false).await;

        let (status, _) = send(
            app.router,
            "POST",
            "/api/profile-events",
            Some(r#"{"type": "learner_deleted", "learner_id": 9}"#),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn deleting_program_with_versions_conflicts() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(app.router, "DELETE", "/api/programs/1", None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "STRUCTURE_VIOLATION");
    }

    #[tokio::test]
    async fn deleting_missing_cycle_item_is_404() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(app.router, "DELETE", "/api/cycle-items/5", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "CYCLE_ITEM_NOT_FOUND");
    }

    #[tokio::test]
    async fn deleting_empty_cycle_succeeds() {
        let app = test_app(origin(), true).await;

        let (status, body) = send(app.router, "DELETE", "/api/cycles/102", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "cycle");
    }
}
