//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresDefinitionStore` - programs, versions, cycles and items
//! - `PostgresAssignmentRepository` - learner assignments
//! - `PostgresEnrollmentBridge` - course lookup and enrollment
//!
//! Queries are checked at runtime; the schema lives in `migrations/`.

mod assignment_repository;
mod definition_store;
mod enrollment_bridge;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, Timestamp, ValidationError};

pub use assignment_repository::PostgresAssignmentRepository;
pub use definition_store::PostgresDefinitionStore;
pub use enrollment_bridge::PostgresEnrollmentBridge;

/// Opens a connection pool sized from configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(Some(config.idle_timeout()))
        .max_lifetime(Some(config.max_lifetime()))
        .connect(&config.url)
        .await
}

/// Applies the bundled migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", name), e))
}

fn timestamp(row: &PgRow, name: &str) -> Result<Timestamp, DomainError> {
    let value: DateTime<Utc> = column(row, name)?;
    Ok(Timestamp::from_datetime(value))
}

/// Reads a nullable timestamp; the Unix epoch also counts as "not set".
fn optional_timestamp(row: &PgRow, name: &str) -> Result<Option<Timestamp>, DomainError> {
    let value: Option<DateTime<Utc>> = column(row, name)?;
    Ok(Timestamp::from_optional_unix_secs(value.map(|v| v.timestamp())))
}

fn to_i32(field: &str, value: u32) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| ValidationError::out_of_range(field, 0, i64::from(i32::MAX), i64::from(value)).into())
}

fn to_u32(field: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| ValidationError::out_of_range(field, 0, i64::from(i32::MAX), i64::from(value)).into())
}
