//! End-to-end progression through the Nursing program using in-memory
//! adapters: profile entry, time-gated activation by sweep, enrollment,
//! program exit and re-entry.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use common::{origin, world, CLINICAL, CORE, NURSING};
use curriculum_engine::adapters::{profile_channel, ProfileEventDispatcher, RetryPolicy};
use curriculum_engine::application::ResolutionContext;
use curriculum_engine::domain::curriculum::{CycleState, EndReason, ProfileEvent};
use curriculum_engine::domain::foundation::{CourseId, CycleId, LearnerId, ProgramId};

fn learner() -> LearnerId {
    LearnerId::new(7)
}

fn enter_nursing() -> ProfileEvent {
    ProfileEvent::changed(learner(), [], [Some("1")])
}

fn leave_nursing() -> ProfileEvent {
    ProfileEvent::changed(learner(), [Some("1")], [Some("")])
}

#[tokio::test]
async fn entering_program_starts_first_cycle_and_enrolls() {
    let w = world().await;

    let outcome = w.profile.sync(&enter_nursing()).await.unwrap();

    assert_eq!(outcome.started, vec![ProgramId::new(NURSING)]);
    let assignments = w.store.all_assignments().await;
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].cycle_id(), CycleId::new(CORE));
    assert_eq!(assignments[0].start(), origin());
    assert_eq!(
        w.enrollment.courses_for(&learner()).await,
        vec![CourseId::new(501), CourseId::new(502)]
    );
    assert!(w.events.has_event("cycle.assigned.v1"));
    assert_eq!(w.audit.assigned_count(), 1);
}

#[tokio::test]
async fn clinical_unlocks_after_ninety_days() {
    let w = world().await;
    w.profile.sync(&enter_nursing()).await.unwrap();

    w.clock.set(origin().plus_days(89));
    assert_eq!(w.sweep.run().await.unwrap().assignments_created, 0);

    // 2024-05-30
    w.clock.set(origin().plus_days(90));
    let report = w.sweep.run().await.unwrap();

    assert_eq!(report.assignments_created, 1);
    let clinical = w
        .store
        .all_assignments()
        .await
        .into_iter()
        .find(|a| a.cycle_id() == CycleId::new(CLINICAL))
        .unwrap();
    assert_eq!(clinical.start(), origin().plus_days(90));
    assert!(w
        .enrollment
        .courses_for(&learner())
        .await
        .contains(&CourseId::new(503)));
}

#[tokio::test]
async fn repeated_sweeps_are_idempotent() {
    let w = world().await;
    w.profile.sync(&enter_nursing()).await.unwrap();
    w.clock.set(origin().plus_days(120));

    let first = w.sweep.run().await.unwrap();
    let second = w.sweep.run().await.unwrap();

    assert_eq!(first.assignments_created, 1);
    assert_eq!(second.assignments_created, 0);
    assert_eq!(w.store.assignment_count().await, 2);
    assert_eq!(w.events.events_of_type("cycle.assigned.v1").len(), 2);
}

#[tokio::test]
async fn timeline_tracks_each_stage() {
    let w = world().await;
    w.profile.sync(&enter_nursing()).await.unwrap();
    w.clock.set(origin().plus_days(30));

    let ctx = ResolutionContext::from_clock(w.clock.as_ref());
    let timeline = w
        .resolver
        .learner_timeline(&ctx, &ProgramId::new(NURSING), &learner())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(timeline.origin, origin());
    assert!(matches!(
        timeline.cycles[0].state,
        CycleState::InProgress { .. }
    ));
    assert_eq!(timeline.cycles[1].state, CycleState::Pending);
    assert_eq!(timeline.cycles[1].activation_time, Some(origin().plus_days(90)));
    assert_eq!(timeline.next_activation, Some(origin().plus_days(90)));
}

#[tokio::test]
async fn leaving_program_closes_every_open_assignment() {
    let w = world().await;
    w.profile.sync(&enter_nursing()).await.unwrap();
    w.clock.set(origin().plus_days(100));
    w.sweep.run().await.unwrap();

    let outcome = w.profile.sync(&leave_nursing()).await.unwrap();

    assert_eq!(outcome.closed.len(), 2);
    for assignment in w.store.all_assignments().await {
        assert!(!assignment.is_open());
        assert_eq!(assignment.end(), Some(origin().plus_days(100)));
        assert_eq!(assignment.end_reason(), Some(EndReason::ProgramChange));
    }
    assert_eq!(w.audit.closed_count(), 2);

    let ctx = ResolutionContext::from_clock(w.clock.as_ref());
    let active = w
        .resolver
        .user_active_cycles(&ctx, &ProgramId::new(NURSING), &learner())
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn reentry_restarts_first_cycle_and_keeps_origin() {
    let w = world().await;
    w.profile.sync(&enter_nursing()).await.unwrap();
    w.clock.set(origin().plus_days(10));
    w.profile.sync(&leave_nursing()).await.unwrap();

    w.clock.set(origin().plus_days(20));
    let outcome = w.profile.sync(&enter_nursing()).await.unwrap();

    assert_eq!(outcome.started, vec![ProgramId::new(NURSING)]);
    let open: Vec<_> = w
        .store
        .all_assignments()
        .await
        .into_iter()
        .filter(|a| a.is_open())
        .collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].cycle_id(), CycleId::new(CORE));
    assert_eq!(open[0].start(), origin().plus_days(20));

    let ctx = ResolutionContext::from_clock(w.clock.as_ref());
    let timeline = w
        .resolver
        .learner_timeline(&ctx, &ProgramId::new(NURSING), &learner())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(timeline.origin, origin());
}

#[tokio::test]
async fn repeated_entry_event_is_a_no_op() {
    let w = world().await;
    w.profile.sync(&enter_nursing()).await.unwrap();

    let again = w.profile.sync(&enter_nursing()).await.unwrap();

    assert!(again.started.is_empty());
    assert!(again.closed.is_empty());
    assert_eq!(w.store.assignment_count().await, 1);
}

#[tokio::test]
async fn learner_deletion_closes_with_deleted_reason() {
    let w = world().await;
    w.profile.sync(&enter_nursing()).await.unwrap();

    w.profile
        .sync(&ProfileEvent::LearnerDeleted {
            learner_id: learner(),
        })
        .await
        .unwrap();

    let assignments = w.store.all_assignments().await;
    assert_eq!(assignments[0].end_reason(), Some(EndReason::LearnerDeleted));
}

#[tokio::test]
async fn unknown_program_starts_nothing() {
    let w = world().await;

    let outcome = w
        .profile
        .sync(&ProfileEvent::changed(learner(), [], [Some("42")]))
        .await
        .unwrap();

    assert!(outcome.started.is_empty());
    assert_eq!(w.store.assignment_count().await, 0);
}

#[tokio::test]
async fn queued_events_apply_in_order() {
    let w = world().await;
    let dispatcher = Arc::new(ProfileEventDispatcher::new().register(w.profile.clone()));
    let (sender, worker) = profile_channel(8, dispatcher);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(worker.run(shutdown_rx));

    sender.send(enter_nursing()).await.unwrap();
    sender.send(leave_nursing()).await.unwrap();
    sender.send(enter_nursing()).await.unwrap();
    shutdown_tx.send(true).unwrap();
    let processed = handle.await.unwrap();

    assert_eq!(processed, 3);
    let assignments = w.store.all_assignments().await;
    assert_eq!(assignments.len(), 2);
    assert!(!assignments[0].is_open());
    assert!(assignments[1].is_open());
}

#[tokio::test]
async fn entry_event_survives_a_brief_storage_outage() {
    let w = world().await;
    w.store.fail_next_inserts(2).await;
    let dispatcher = Arc::new(
        ProfileEventDispatcher::new()
            .register(w.profile.clone())
            .with_retry(
                RetryPolicy::default()
                    .with_max_attempts(4)
                    .with_initial_backoff(Duration::from_millis(1)),
            ),
    );
    let (sender, worker) = profile_channel(8, dispatcher);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(worker.run(shutdown_rx));

    sender.send(enter_nursing()).await.unwrap();
    shutdown_tx.send(true).unwrap();
    assert_eq!(handle.await.unwrap(), 1);

    let assignments = w.store.all_assignments().await;
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].cycle_id(), CycleId::new(CORE));
    assert!(assignments[0].is_open());
    assert_eq!(
        w.enrollment.courses_for(&learner()).await,
        vec![CourseId::new(501), CourseId::new(502)]
    );
}
