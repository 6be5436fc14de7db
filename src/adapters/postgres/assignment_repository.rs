//! PostgreSQL implementation of AssignmentRepository.
//!
//! At most one open row per (learner, cycle) is guaranteed by the partial
//! unique index `uq_curriculum_cycle_users_open`; `insert_if_absent` leans
//! on it with `ON CONFLICT DO NOTHING`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use super::{column, optional_timestamp, timestamp};
use crate::domain::curriculum::{Assignment, EndReason, NewAssignment};
use crate::domain::foundation::{
    AssignmentId, CycleId, DomainError, ErrorCode, LearnerId, ProgramId, VersionId,
};
use crate::ports::{AssignmentRepository, InsertOutcome, ProgramAssignment};

const COLUMNS: &str = "u.id, u.cycle_id, u.learner_id, u.time_start, u.time_end, u.end_reason";

/// Attempts before giving up when the open row vanishes between the
/// conflicting insert and the follow-up read.
const INSERT_ATTEMPTS: usize = 3;

/// PostgreSQL store for learner assignments.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_open(
        &self,
        learner_id: &LearnerId,
        cycle_id: &CycleId,
    ) -> Result<Option<Assignment>, DomainError> {
        let sql = format!(
            "SELECT {} FROM curriculum_cycle_users u \
             WHERE u.learner_id = $1 AND u.cycle_id = $2 AND u.time_end IS NULL",
            COLUMNS
        );
        sqlx::query(&sql)
            .bind(learner_id.as_i64())
            .bind(cycle_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch open assignment", e))?
            .map(row_to_assignment)
            .transpose()
    }
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn find_by_id(&self, id: &AssignmentId) -> Result<Option<Assignment>, DomainError> {
        let sql = format!("SELECT {} FROM curriculum_cycle_users u WHERE u.id = $1", COLUMNS);
        sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch assignment", e))?
            .map(row_to_assignment)
            .transpose()
    }

    async fn list_for_learner_in_cycles(
        &self,
        learner_id: &LearnerId,
        cycle_ids: &[CycleId],
    ) -> Result<Vec<Assignment>, DomainError> {
        if cycle_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = cycle_ids.iter().map(CycleId::as_i64).collect();
        let sql = format!(
            "SELECT {} FROM curriculum_cycle_users u \
             WHERE u.learner_id = $1 AND u.cycle_id = ANY($2) ORDER BY u.id",
            COLUMNS
        );
        sqlx::query(&sql)
            .bind(learner_id.as_i64())
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list learner assignments", e))?
            .into_iter()
            .map(row_to_assignment)
            .collect()
    }

    async fn earliest_in_program(
        &self,
        program_id: &ProgramId,
        learner_id: &LearnerId,
    ) -> Result<Option<ProgramAssignment>, DomainError> {
        let sql = format!(
            r#"
            SELECT {}, c.version_id
            FROM curriculum_cycle_users u
            JOIN curriculum_cycles c ON c.id = u.cycle_id
            JOIN curriculum_versions v ON v.id = c.version_id
            WHERE v.program_id = $1 AND u.learner_id = $2
            ORDER BY u.time_start, u.id
            LIMIT 1
            "#,
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(program_id.as_i64())
            .bind(learner_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch earliest assignment", e))?;

        match row {
            Some(row) => {
                let version_id = VersionId::new(column(&row, "version_id")?);
                Ok(Some(ProgramAssignment {
                    assignment: row_to_assignment(row)?,
                    version_id,
                }))
            }
            None => Ok(None),
        }
    }

    async fn learners_in_program(
        &self,
        program_id: &ProgramId,
    ) -> Result<Vec<LearnerId>, DomainError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT u.learner_id
            FROM curriculum_cycle_users u
            JOIN curriculum_cycles c ON c.id = u.cycle_id
            JOIN curriculum_versions v ON v.id = c.version_id
            WHERE v.program_id = $1
            ORDER BY u.learner_id
            "#,
        )
        .bind(program_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list program learners", e))?;

        Ok(rows.into_iter().map(|(id,)| LearnerId::new(id)).collect())
    }

    async fn open_program_ids(
        &self,
        learner_id: &LearnerId,
    ) -> Result<BTreeSet<ProgramId>, DomainError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT v.program_id
            FROM curriculum_cycle_users u
            JOIN curriculum_cycles c ON c.id = u.cycle_id
            JOIN curriculum_versions v ON v.id = c.version_id
            WHERE u.learner_id = $1 AND u.time_end IS NULL
            "#,
        )
        .bind(learner_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list open programs", e))?;

        Ok(rows.into_iter().map(|(id,)| ProgramId::new(id)).collect())
    }

    async fn open_in_program(
        &self,
        learner_id: &LearnerId,
        program_id: &ProgramId,
    ) -> Result<Vec<Assignment>, DomainError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM curriculum_cycle_users u
            JOIN curriculum_cycles c ON c.id = u.cycle_id
            JOIN curriculum_versions v ON v.id = c.version_id
            WHERE u.learner_id = $1 AND v.program_id = $2 AND u.time_end IS NULL
            ORDER BY u.id
            "#,
            COLUMNS
        );
        sqlx::query(&sql)
            .bind(learner_id.as_i64())
            .bind(program_id.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list open assignments", e))?
            .into_iter()
            .map(row_to_assignment)
            .collect()
    }

    async fn exists_for_cycle(&self, cycle_id: &CycleId) -> Result<bool, DomainError> {
        let (found,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM curriculum_cycle_users WHERE cycle_id = $1)",
        )
        .bind(cycle_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check cycle assignments", e))?;

        Ok(found)
    }

    async fn insert_if_absent(&self, new: NewAssignment) -> Result<InsertOutcome, DomainError> {
        for _ in 0..INSERT_ATTEMPTS {
            let inserted: Option<(i64,)> = sqlx::query_as(
                r#"
                INSERT INTO curriculum_cycle_users (cycle_id, learner_id, time_start)
                VALUES ($1, $2, $3)
                ON CONFLICT (learner_id, cycle_id) WHERE time_end IS NULL DO NOTHING
                RETURNING id
                "#,
            )
            .bind(new.cycle_id.as_i64())
            .bind(new.learner_id.as_i64())
            .bind(new.start.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to insert assignment", e))?;

            if let Some((id,)) = inserted {
                return Ok(InsertOutcome::Inserted(Assignment::opened(
                    AssignmentId::new(id),
                    new,
                )));
            }

            // The open row may have been closed since the conflict; try again.
            if let Some(existing) = self.find_open(&new.learner_id, &new.cycle_id).await? {
                return Ok(InsertOutcome::AlreadyOpen(existing));
            }
        }

        Err(DomainError::new(
            ErrorCode::InternalError,
            format!(
                "Could not settle assignment of learner {} to cycle {}",
                new.learner_id, new.cycle_id
            ),
        ))
    }

    async fn close(&self, assignment: &Assignment) -> Result<(), DomainError> {
        let (end, reason) = match (assignment.end(), assignment.end_reason()) {
            (Some(end), Some(reason)) => (end, reason),
            _ => {
                return Err(DomainError::validation(
                    "end",
                    format!("Assignment {} has no end to record", assignment.id()),
                ))
            }
        };

        let result = sqlx::query(
            r#"
            UPDATE curriculum_cycle_users
            SET time_end = $2, end_reason = $3
            WHERE id = $1 AND time_end IS NULL
            "#,
        )
        .bind(assignment.id().as_i64())
        .bind(end.as_datetime())
        .bind(reason.code())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to close assignment", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find_by_id(&assignment.id()).await? {
            None => Err(DomainError::new(
                ErrorCode::AssignmentNotFound,
                format!("Assignment not found: {}", assignment.id()),
            )),
            Some(_) => Err(DomainError::new(
                ErrorCode::AssignmentAlreadyEnded,
                format!("Assignment {} has already ended", assignment.id()),
            )),
        }
    }
}

fn row_to_assignment(row: PgRow) -> Result<Assignment, DomainError> {
    let end_reason: Option<i16> = column(&row, "end_reason")?;
    let end_reason = end_reason.map(EndReason::from_code).transpose()?;

    Ok(Assignment::reconstitute(
        AssignmentId::new(column(&row, "id")?),
        CycleId::new(column(&row, "cycle_id")?),
        LearnerId::new(column(&row, "learner_id")?),
        timestamp(&row, "time_start")?,
        optional_timestamp(&row, "time_end")?,
        end_reason,
    ))
}
