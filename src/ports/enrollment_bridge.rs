//! Enrollment bridge port.
//!
//! Resolves course code patterns to host-platform courses and enrolls
//! learners in them under a named enrollment channel. Enrollment is
//! idempotent: enrolling an already-enrolled learner is not an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::curriculum::CoursePattern;
use crate::domain::foundation::{CourseId, LearnerId};

/// A course on the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    /// External code matched by cycle item patterns.
    pub idnumber: String,
}

/// One enrollment to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRequest {
    pub course_id: CourseId,
    pub learner_id: LearnerId,
    /// Role shortname granted in the course.
    pub role: String,
    /// Enrollment channel (method) name.
    pub channel: String,
}

/// Result of an enrollment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Enrolled,
    AlreadyEnrolled,
    /// The channel is disabled, so no method could be used or created.
    Unavailable,
}

/// Errors from the enrollment backend.
#[derive(Debug, Clone, Error)]
pub enum EnrollmentError {
    #[error("Course {0} does not exist")]
    CourseNotFound(CourseId),

    #[error("Role '{0}' is not defined")]
    UnknownRole(String),

    #[error("Enrollment backend failure: {0}")]
    Backend(String),
}

/// Port to the host platform's enrollment facility.
#[async_trait]
pub trait EnrollmentBridge: Send + Sync {
    /// Courses whose idnumber matches the pattern.
    ///
    /// Exact patterns return at most one course; `%` matches any run of
    /// characters.
    async fn resolve_courses(&self, pattern: &CoursePattern)
        -> Result<Vec<Course>, EnrollmentError>;

    /// Enrolls the learner, creating the channel's method on the course on
    /// first use.
    async fn enroll(&self, request: &EnrollmentRequest)
        -> Result<EnrollmentOutcome, EnrollmentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_bridge_is_object_safe() {
        fn _accepts_dyn(_bridge: &dyn EnrollmentBridge) {}
    }

    #[test]
    fn enrollment_error_messages() {
        assert_eq!(
            EnrollmentError::CourseNotFound(CourseId::new(4)).to_string(),
            "Course 4 does not exist"
        );
        assert_eq!(
            EnrollmentError::UnknownRole("student".into()).to_string(),
            "Role 'student' is not defined"
        );
    }
}
