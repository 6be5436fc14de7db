//! PostgreSQL implementation of EnrollmentBridge.
//!
//! Works against the host platform's course catalogue (`courses`), its
//! enrollment methods (`enrol_methods`, one per course and channel) and
//! learner enrollments (`user_enrolments`).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::curriculum::CoursePattern;
use crate::domain::foundation::CourseId;
use crate::ports::{Course, EnrollmentBridge, EnrollmentError, EnrollmentOutcome, EnrollmentRequest};

fn backend(context: &str, err: sqlx::Error) -> EnrollmentError {
    EnrollmentError::Backend(format!("{}: {}", context, err))
}

/// Enrollment bridge backed by the platform database.
#[derive(Clone)]
pub struct PostgresEnrollmentBridge {
    pool: PgPool,
    /// Whether a missing method may be created on first use.
    channel_enabled: bool,
}

impl PostgresEnrollmentBridge {
    pub fn new(pool: PgPool, channel_enabled: bool) -> Self {
        Self {
            pool,
            channel_enabled,
        }
    }

    /// Returns the method id for (course, channel), creating it when allowed.
    async fn method_for(&self, request: &EnrollmentRequest) -> Result<Option<i64>, EnrollmentError> {
        let existing: Option<(i64, bool)> = sqlx::query_as(
            "SELECT id, enabled FROM enrol_methods WHERE course_id = $1 AND channel = $2",
        )
        .bind(request.course_id.as_i64())
        .bind(&request.channel)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend("Failed to fetch enrollment method", e))?;

        match existing {
            Some((id, true)) => return Ok(Some(id)),
            Some((_, false)) => return Ok(None),
            None if !self.channel_enabled => return Ok(None),
            None => {}
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO enrol_methods (course_id, channel)
            VALUES ($1, $2)
            ON CONFLICT (course_id, channel) DO UPDATE SET channel = EXCLUDED.channel
            RETURNING id
            "#,
        )
        .bind(request.course_id.as_i64())
        .bind(&request.channel)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| backend("Failed to create enrollment method", e))?;

        tracing::info!(
            course_id = %request.course_id,
            channel = %request.channel,
            "Created enrollment method"
        );

        Ok(Some(id))
    }
}

#[async_trait]
impl EnrollmentBridge for PostgresEnrollmentBridge {
    async fn resolve_courses(
        &self,
        pattern: &CoursePattern,
    ) -> Result<Vec<Course>, EnrollmentError> {
        let rows: Vec<(i64, String)> = if pattern.is_wildcard() {
            sqlx::query_as(
                r"SELECT id, idnumber FROM courses WHERE idnumber LIKE $1 ESCAPE '\' ORDER BY id",
            )
            .bind(pattern.to_sql_like())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as("SELECT id, idnumber FROM courses WHERE idnumber = $1 ORDER BY id")
                .bind(pattern.as_str())
                .fetch_all(&self.pool)
                .await
        }
        .map_err(|e| backend("Failed to resolve courses", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, idnumber)| Course {
                id: CourseId::new(id),
                idnumber,
            })
            .collect())
    }

    async fn enroll(
        &self,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentOutcome, EnrollmentError> {
        let (course_exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1)")
                .bind(request.course_id.as_i64())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| backend("Failed to check course", e))?;
        if !course_exists {
            return Err(EnrollmentError::CourseNotFound(request.course_id));
        }

        let role: Option<(i64,)> = sqlx::query_as("SELECT id FROM roles WHERE shortname = $1")
            .bind(&request.role)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend("Failed to fetch role", e))?;
        let (role_id,) = role.ok_or_else(|| EnrollmentError::UnknownRole(request.role.clone()))?;

        let method_id = match self.method_for(request).await? {
            Some(id) => id,
            None => return Ok(EnrollmentOutcome::Unavailable),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO user_enrolments (method_id, learner_id, role_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (method_id, learner_id) DO NOTHING
            "#,
        )
        .bind(method_id)
        .bind(request.learner_id.as_i64())
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| backend("Failed to enroll learner", e))?;

        if result.rows_affected() == 0 {
            Ok(EnrollmentOutcome::AlreadyEnrolled)
        } else {
            Ok(EnrollmentOutcome::Enrolled)
        }
    }
}
