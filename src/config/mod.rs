//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `CURRICULUM` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use curriculum_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod enrollment;
mod error;
mod log;
mod profile;
mod server;
mod sweep;

pub use database::DatabaseConfig;
pub use enrollment::EnrollmentConfig;
pub use error::{ConfigError, ValidationError};
pub use log::LogConfig;
pub use profile::ProfileEventsConfig;
pub use server::{Environment, ServerConfig};
pub use sweep::SweepConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Cycle activation sweep schedule
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Enrollment channel and role
    #[serde(default)]
    pub enrollment: EnrollmentConfig,

    /// Profile event queue and retries
    #[serde(default)]
    pub profile_events: ProfileEventsConfig,

    /// Log filter and format
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CURRICULUM` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `CURRICULUM__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CURRICULUM__SWEEP__INTERVAL_SECS=3600` -> `sweep.interval_secs = 3600`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CURRICULUM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.sweep.validate()?;
        self.enrollment.validate()?;
        self.profile_events.validate()?;
        self.log.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
