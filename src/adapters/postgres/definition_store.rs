//! PostgreSQL implementation of DefinitionReader and DefinitionRepository.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use super::{column, optional_timestamp, timestamp, to_i32, to_u32};
use crate::domain::curriculum::{CoursePattern, Cycle, CycleItem, Program, Version};
use crate::domain::foundation::{
    CycleId, CycleItemId, DomainError, ErrorCode, ProgramId, VersionId,
};
use crate::ports::{DefinitionReader, DefinitionRepository};

const PROGRAM_COLUMNS: &str = "id, name, enabled, description, created_at, modified_at";
const VERSION_COLUMNS: &str = "id, program_id, name, description, time_start, time_end";
const CYCLE_COLUMNS: &str = "id, version_id, name, description, duration_days, stage";
const ITEM_COLUMNS: &str =
    "id, cycle_id, course_code, group_template, conditions, validity_days";

/// PostgreSQL store for curriculum definitions.
#[derive(Clone)]
pub struct PostgresDefinitionStore {
    pool: PgPool,
}

impl PostgresDefinitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, sql: &str, id: i64, context: &str) -> Result<bool, DomainError> {
        let (found,): (bool,) = sqlx::query_as(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database(context, e))?;
        Ok(found)
    }

    async fn delete(
        &self,
        sql: &str,
        id: i64,
        not_found: ErrorCode,
        label: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(&format!("Failed to delete {}", label), e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                not_found,
                format!("{} not found: {}", label, id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DefinitionReader for PostgresDefinitionStore {
    async fn find_program(&self, id: &ProgramId) -> Result<Option<Program>, DomainError> {
        let sql = format!("SELECT {} FROM curriculum_programs WHERE id = $1", PROGRAM_COLUMNS);
        sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch program", e))?
            .map(row_to_program)
            .transpose()
    }

    async fn list_programs(&self) -> Result<Vec<Program>, DomainError> {
        let sql = format!("SELECT {} FROM curriculum_programs ORDER BY id", PROGRAM_COLUMNS);
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list programs", e))?
            .into_iter()
            .map(row_to_program)
            .collect()
    }

    async fn find_version(&self, id: &VersionId) -> Result<Option<Version>, DomainError> {
        let sql = format!("SELECT {} FROM curriculum_versions WHERE id = $1", VERSION_COLUMNS);
        sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch version", e))?
            .map(row_to_version)
            .transpose()
    }

    async fn versions_by_program(
        &self,
        program_id: &ProgramId,
    ) -> Result<Vec<Version>, DomainError> {
        let sql = format!(
            "SELECT {} FROM curriculum_versions WHERE program_id = $1 ORDER BY time_start, id",
            VERSION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(program_id.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list versions", e))?
            .into_iter()
            .map(row_to_version)
            .collect()
    }

    async fn find_cycle(&self, id: &CycleId) -> Result<Option<Cycle>, DomainError> {
        let sql = format!("SELECT {} FROM curriculum_cycles WHERE id = $1", CYCLE_COLUMNS);
        sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch cycle", e))?
            .map(row_to_cycle)
            .transpose()
    }

    async fn cycles_by_version(&self, version_id: &VersionId) -> Result<Vec<Cycle>, DomainError> {
        let sql = format!(
            "SELECT {} FROM curriculum_cycles WHERE version_id = $1 ORDER BY stage, name, id",
            CYCLE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(version_id.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list cycles", e))?
            .into_iter()
            .map(row_to_cycle)
            .collect()
    }

    async fn find_cycle_item(&self, id: &CycleItemId) -> Result<Option<CycleItem>, DomainError> {
        let sql = format!("SELECT {} FROM curriculum_cycle_items WHERE id = $1", ITEM_COLUMNS);
        sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch cycle item", e))?
            .map(row_to_item)
            .transpose()
    }

    async fn items_by_cycle(&self, cycle_id: &CycleId) -> Result<Vec<CycleItem>, DomainError> {
        let sql = format!(
            "SELECT {} FROM curriculum_cycle_items WHERE cycle_id = $1 ORDER BY id",
            ITEM_COLUMNS
        );
        sqlx::query(&sql)
            .bind(cycle_id.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list cycle items", e))?
            .into_iter()
            .map(row_to_item)
            .collect()
    }
}

#[async_trait]
impl DefinitionRepository for PostgresDefinitionStore {
    async fn save_program(&self, program: &Program) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO curriculum_programs (id, name, enabled, description, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                enabled = EXCLUDED.enabled,
                description = EXCLUDED.description,
                modified_at = EXCLUDED.modified_at
            "#,
        )
        .bind(program.id.as_i64())
        .bind(&program.name)
        .bind(program.enabled)
        .bind(&program.description)
        .bind(program.created_at.as_datetime())
        .bind(program.modified_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save program", e))?;

        Ok(())
    }

    async fn save_version(&self, version: &Version) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO curriculum_versions (id, program_id, name, description, time_start, time_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                program_id = EXCLUDED.program_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                time_start = EXCLUDED.time_start,
                time_end = EXCLUDED.time_end
            "#,
        )
        .bind(version.id.as_i64())
        .bind(version.program_id.as_i64())
        .bind(&version.name)
        .bind(&version.description)
        .bind(version.start.as_datetime())
        .bind(version.end.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save version", e))?;

        Ok(())
    }

    async fn save_cycle(&self, cycle: &Cycle) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO curriculum_cycles (id, version_id, name, description, duration_days, stage)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                version_id = EXCLUDED.version_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                duration_days = EXCLUDED.duration_days,
                stage = EXCLUDED.stage
            "#,
        )
        .bind(cycle.id.as_i64())
        .bind(cycle.version_id.as_i64())
        .bind(&cycle.name)
        .bind(&cycle.description)
        .bind(to_i32("duration_days", cycle.duration_days)?)
        .bind(cycle.stage)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save cycle", e))?;

        Ok(())
    }

    async fn save_cycle_item(&self, item: &CycleItem) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO curriculum_cycle_items
                (id, cycle_id, course_code, group_template, conditions, validity_days)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                cycle_id = EXCLUDED.cycle_id,
                course_code = EXCLUDED.course_code,
                group_template = EXCLUDED.group_template,
                conditions = EXCLUDED.conditions,
                validity_days = EXCLUDED.validity_days
            "#,
        )
        .bind(item.id.as_i64())
        .bind(item.cycle_id.as_i64())
        .bind(item.course_code.as_str())
        .bind(item.group_template.as_deref())
        .bind(item.conditions.clone())
        .bind(to_i32("validity_days", item.validity_days)?)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save cycle item", e))?;

        Ok(())
    }

    async fn delete_program(&self, id: &ProgramId) -> Result<(), DomainError> {
        self.delete(
            "DELETE FROM curriculum_programs WHERE id = $1",
            id.as_i64(),
            ErrorCode::ProgramNotFound,
            "Program",
        )
        .await
    }

    async fn delete_version(&self, id: &VersionId) -> Result<(), DomainError> {
        self.delete(
            "DELETE FROM curriculum_versions WHERE id = $1",
            id.as_i64(),
            ErrorCode::VersionNotFound,
            "Version",
        )
        .await
    }

    async fn delete_cycle(&self, id: &CycleId) -> Result<(), DomainError> {
        self.delete(
            "DELETE FROM curriculum_cycles WHERE id = $1",
            id.as_i64(),
            ErrorCode::CycleNotFound,
            "Cycle",
        )
        .await
    }

    async fn delete_cycle_item(&self, id: &CycleItemId) -> Result<(), DomainError> {
        self.delete(
            "DELETE FROM curriculum_cycle_items WHERE id = $1",
            id.as_i64(),
            ErrorCode::CycleItemNotFound,
            "Cycle item",
        )
        .await
    }

    async fn program_has_versions(&self, id: &ProgramId) -> Result<bool, DomainError> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM curriculum_versions WHERE program_id = $1)",
            id.as_i64(),
            "Failed to check program versions",
        )
        .await
    }

    async fn version_has_cycles(&self, id: &VersionId) -> Result<bool, DomainError> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM curriculum_cycles WHERE version_id = $1)",
            id.as_i64(),
            "Failed to check version cycles",
        )
        .await
    }

    async fn cycle_has_items(&self, id: &CycleId) -> Result<bool, DomainError> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM curriculum_cycle_items WHERE cycle_id = $1)",
            id.as_i64(),
            "Failed to check cycle items",
        )
        .await
    }
}

fn row_to_program(row: PgRow) -> Result<Program, DomainError> {
    Ok(Program {
        id: ProgramId::new(column(&row, "id")?),
        name: column(&row, "name")?,
        enabled: column(&row, "enabled")?,
        description: column(&row, "description")?,
        created_at: timestamp(&row, "created_at")?,
        modified_at: timestamp(&row, "modified_at")?,
    })
}

fn row_to_version(row: PgRow) -> Result<Version, DomainError> {
    Ok(Version {
        id: VersionId::new(column(&row, "id")?),
        program_id: ProgramId::new(column(&row, "program_id")?),
        name: column(&row, "name")?,
        description: column(&row, "description")?,
        start: timestamp(&row, "time_start")?,
        end: optional_timestamp(&row, "time_end")?,
    })
}

fn row_to_cycle(row: PgRow) -> Result<Cycle, DomainError> {
    Ok(Cycle {
        id: CycleId::new(column(&row, "id")?),
        version_id: VersionId::new(column(&row, "version_id")?),
        name: column(&row, "name")?,
        description: column(&row, "description")?,
        duration_days: to_u32("duration_days", column(&row, "duration_days")?)?,
        stage: column(&row, "stage")?,
    })
}

fn row_to_item(row: PgRow) -> Result<CycleItem, DomainError> {
    let course_code: String = column(&row, "course_code")?;
    let conditions: Option<JsonValue> = column(&row, "conditions")?;

    Ok(CycleItem {
        id: CycleItemId::new(column(&row, "id")?),
        cycle_id: CycleId::new(column(&row, "cycle_id")?),
        course_code: CoursePattern::new(course_code)?,
        group_template: column(&row, "group_template")?,
        conditions,
        validity_days: to_u32("validity_days", column(&row, "validity_days")?)?,
    })
}
