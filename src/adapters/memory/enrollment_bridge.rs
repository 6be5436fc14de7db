//! In-memory enrollment bridge.
//!
//! Keeps a course catalogue and the set of enrollments in memory. Failures
//! can be injected per course to exercise the operator's error handling.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::curriculum::CoursePattern;
use crate::domain::foundation::{CourseId, LearnerId};
use crate::ports::{Course, EnrollmentBridge, EnrollmentError, EnrollmentOutcome, EnrollmentRequest};

/// Recorded enrollment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnrollmentRecord {
    pub course_id: CourseId,
    pub learner_id: LearnerId,
    pub role: String,
    pub channel: String,
}

#[derive(Debug, Default)]
struct State {
    courses: BTreeMap<CourseId, String>,
    enrollments: BTreeSet<EnrollmentRecord>,
    methods: HashSet<(CourseId, String)>,
    failing_courses: HashSet<CourseId>,
}

/// In-memory implementation of `EnrollmentBridge`.
#[derive(Debug, Clone)]
pub struct InMemoryEnrollmentBridge {
    state: Arc<RwLock<State>>,
    channel_enabled: bool,
}

impl InMemoryEnrollmentBridge {
    /// Creates a bridge whose channel is enabled.
    pub fn new() -> Self {
        Self::with_channel_enabled(true)
    }

    pub fn with_channel_enabled(channel_enabled: bool) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            channel_enabled,
        }
    }

    /// Registers a course in the catalogue.
    pub async fn add_course(&self, id: CourseId, idnumber: impl Into<String>) {
        self.state.write().await.courses.insert(id, idnumber.into());
    }

    /// Makes every enrollment into `course_id` fail.
    pub async fn fail_course(&self, course_id: CourseId) {
        self.state.write().await.failing_courses.insert(course_id);
    }

    // === Test Helpers ===

    /// All enrollments, ordered by course then learner.
    pub async fn enrollments(&self) -> Vec<EnrollmentRecord> {
        self.state.read().await.enrollments.iter().cloned().collect()
    }

    /// Courses the learner is enrolled in.
    pub async fn courses_for(&self, learner_id: &LearnerId) -> Vec<CourseId> {
        self.state
            .read()
            .await
            .enrollments
            .iter()
            .filter(|e| e.learner_id == *learner_id)
            .map(|e| e.course_id)
            .collect()
    }
}

impl Default for InMemoryEnrollmentBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrollmentBridge for InMemoryEnrollmentBridge {
    async fn resolve_courses(
        &self,
        pattern: &CoursePattern,
    ) -> Result<Vec<Course>, EnrollmentError> {
        let state = self.state.read().await;
        Ok(state
            .courses
            .iter()
            .filter(|(_, idnumber)| pattern.matches(idnumber))
            .map(|(id, idnumber)| Course {
                id: *id,
                idnumber: idnumber.clone(),
            })
            .collect())
    }

    async fn enroll(
        &self,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentOutcome, EnrollmentError> {
        let mut state = self.state.write().await;

        if !state.courses.contains_key(&request.course_id) {
            return Err(EnrollmentError::CourseNotFound(request.course_id));
        }
        if state.failing_courses.contains(&request.course_id) {
            return Err(EnrollmentError::Backend(format!(
                "injected failure for course {}",
                request.course_id
            )));
        }

        let method = (request.course_id, request.channel.clone());
        if !state.methods.contains(&method) {
            if !self.channel_enabled {
                return Ok(EnrollmentOutcome::Unavailable);
            }
            state.methods.insert(method);
        }

        let record = EnrollmentRecord {
            course_id: request.course_id,
            learner_id: request.learner_id,
            role: request.role.clone(),
            channel: request.channel.clone(),
        };
        if state.enrollments.insert(record) {
            Ok(EnrollmentOutcome::Enrolled)
        } else {
            Ok(EnrollmentOutcome::AlreadyEnrolled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(course: i64, learner: i64) -> EnrollmentRequest {
        EnrollmentRequest {
            course_id: CourseId::new(course),
            learner_id: LearnerId::new(learner),
            role: "student".to_string(),
            channel: "curriculum".to_string(),
        }
    }

    async fn catalogue() -> InMemoryEnrollmentBridge {
        let bridge = InMemoryEnrollmentBridge::new();
        bridge.add_course(CourseId::new(1), "BIO-101").await;
        bridge.add_course(CourseId::new(2), "BIO-250").await;
        bridge.add_course(CourseId::new(3), "BIOCHEM-1").await;
        bridge
    }

    #[tokio::test]
    async fn wildcard_resolves_course_family() {
        let bridge = catalogue().await;

        let courses = bridge
            .resolve_courses(&CoursePattern::new("BIO-%").unwrap())
            .await
            .unwrap();

        let codes: Vec<&str> = courses.iter().map(|c| c.idnumber.as_str()).collect();
        assert_eq!(codes, vec!["BIO-101", "BIO-250"]);
    }

    #[tokio::test]
    async fn exact_code_resolves_single_course() {
        let bridge = catalogue().await;

        let courses = bridge
            .resolve_courses(&CoursePattern::new("BIO-101").unwrap())
            .await
            .unwrap();

        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, CourseId::new(1));
    }

    #[tokio::test]
    async fn enrolling_twice_is_idempotent() {
        let bridge = catalogue().await;

        assert_eq!(bridge.enroll(&request(1, 5)).await.unwrap(), EnrollmentOutcome::Enrolled);
        assert_eq!(
            bridge.enroll(&request(1, 5)).await.unwrap(),
            EnrollmentOutcome::AlreadyEnrolled
        );
        assert_eq!(bridge.enrollments().await.len(), 1);
    }

    #[tokio::test]
    async fn disabled_channel_is_unavailable() {
        let bridge = InMemoryEnrollmentBridge::with_channel_enabled(false);
        bridge.add_course(CourseId::new(1), "BIO-101").await;

        assert_eq!(
            bridge.enroll(&request(1, 5)).await.unwrap(),
            EnrollmentOutcome::Unavailable
        );
        assert!(bridge.enrollments().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_and_failing_courses_error() {
        let bridge = catalogue().await;
        bridge.fail_course(CourseId::new(2)).await;

        assert!(matches!(
            bridge.enroll(&request(99, 5)).await,
            Err(EnrollmentError::CourseNotFound(_))
        ));
        assert!(matches!(
            bridge.enroll(&request(2, 5)).await,
            Err(EnrollmentError::Backend(_))
        ));
    }
}
