//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Sweep interval must be between 60 seconds and 7 days")]
    InvalidSweepInterval,

    #[error("Enrollment {0} must not be blank")]
    BlankEnrollmentSetting(&'static str),

    #[error("Profile event queue capacity must be at least 1")]
    InvalidQueueCapacity,

    #[error("Profile event retry attempts must be between 1 and 20")]
    InvalidRetryAttempts,

    #[error("Profile event retry backoff exceeds its maximum")]
    InvalidRetryBackoff,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
