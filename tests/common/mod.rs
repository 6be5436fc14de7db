//! Shared fixture: a Nursing program wired through the in-memory adapters.
//!
//! Version "2024" has two cycles: Core (90 days, courses `NUR-1%`) and
//! Clinical (60 days, course `NUR-CLIN`).

#![allow(dead_code)]

use std::sync::Arc;

use curriculum_engine::adapters::memory::{InMemoryCurriculumStore, InMemoryEnrollmentBridge};
use curriculum_engine::adapters::{AssignmentAuditLog, FixedClock, InMemoryEventBus};
use curriculum_engine::application::{
    CurriculumResolver, EnrollmentSettings, ProfileEventAdapter, ProgressionOperator, SweepTask,
};
use curriculum_engine::domain::curriculum::{CoursePattern, Cycle, CycleItem, Program, Version};
use curriculum_engine::domain::foundation::{
    CourseId, CycleId, CycleItemId, ProgramId, Timestamp, VersionId,
};
use curriculum_engine::ports::{DefinitionRepository, EventSubscriber};

pub const NURSING: i64 = 1;
pub const CORE: i64 = 101;
pub const CLINICAL: i64 = 102;

/// 2024-03-01T00:00:00Z
pub fn origin() -> Timestamp {
    Timestamp::from_unix_secs(1_709_251_200)
}

pub struct World {
    pub store: InMemoryCurriculumStore,
    pub enrollment: Arc<InMemoryEnrollmentBridge>,
    pub events: Arc<InMemoryEventBus>,
    pub audit: Arc<AssignmentAuditLog>,
    pub clock: Arc<FixedClock>,
    pub resolver: Arc<CurriculumResolver>,
    pub operator: Arc<ProgressionOperator>,
    pub sweep: Arc<SweepTask>,
    pub profile: Arc<ProfileEventAdapter>,
}

async fn seed_definitions(store: &InMemoryCurriculumStore) {
    store
        .save_program(&Program {
            id: ProgramId::new(NURSING),
            name: "Nursing".to_string(),
            enabled: true,
            description: "Bachelor of Nursing".to_string(),
            created_at: origin().minus_days(90),
            modified_at: origin().minus_days(90),
        })
        .await
        .unwrap();
    store
        .save_version(&Version {
            id: VersionId::new(10),
            program_id: ProgramId::new(NURSING),
            name: "2024".to_string(),
            description: String::new(),
            start: origin().minus_days(60),
            end: None,
        })
        .await
        .unwrap();

    for (id, stage, name, days, item, code) in [
        (CORE, 1, "Core", 90, 1001, "NUR-1%"),
        (CLINICAL, 2, "Clinical", 60, 1002, "NUR-CLIN"),
    ] {
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
        store
            .save_cycle_item(&CycleItem {
                id: CycleItemId::new(item),
                cycle_id: CycleId::new(id),
                course_code: CoursePattern::new(code).unwrap(),
                group_template: None,
                conditions: None,
                validity_days: 0,
            })
            .await
            .unwrap();
    }
}

pub async fn world() -> World {
    let store = InMemoryCurriculumStore::new();
    seed_definitions(&store).await;

    let enrollment = Arc::new(InMemoryEnrollmentBridge::new());
    for (id, idnumber) in [
        (501, "NUR-101"),
        (502, "NUR-102"),
        (503, "NUR-CLIN"),
        (504, "MED-101"),
    ] {
        enrollment.add_course(CourseId::new(id), idnumber).await;
    }

    let events = Arc::new(InMemoryEventBus::new());
    let audit = Arc::new(AssignmentAuditLog::new());
    events.subscribe_all(AssignmentAuditLog::EVENT_TYPES, audit.clone());

    let clock = Arc::new(FixedClock::new(origin()));
    let resolver = Arc::new(CurriculumResolver::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    ));
    let operator = Arc::new(ProgressionOperator::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        enrollment.clone(),
        events.clone(),
        resolver.clone(),
        EnrollmentSettings::default(),
    ));
    let sweep = Arc::new(SweepTask::new(
        resolver.clone(),
        operator.clone(),
        Arc::new(store.clone()),
        clock.clone(),
    ));
    let profile = Arc::new(ProfileEventAdapter::new(
        Arc::new(store.clone()),
        operator.clone(),
        clock.clone(),
    ));

    World {
        store,
        enrollment,
        events,
        audit,
        clock,
        resolver,
        operator,
        sweep,
        profile,
    }
}
