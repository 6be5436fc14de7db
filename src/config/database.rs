//! PostgreSQL pool configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 100;

/// Connection pool shared by the HTTP handlers, the sweep and the profile
/// worker.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` URL; required
    pub url: String,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Apply `migrations/` before serving
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CURRICULUM__DATABASE__URL"));
        }
        if !["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            run_migrations: default_run_migrations(),
        }
    }
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_max_lifetime() -> u64 {
    1800
}

fn default_run_migrations() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curriculum_db() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://curriculum@db:5432/curriculum".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn migrations_run_by_default() {
        let config = curriculum_db();
        assert!(config.run_migrations);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_lifetime(), Duration::from_secs(1800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn both_postgres_schemes_are_accepted() {
        let long = DatabaseConfig {
            url: "postgresql://curriculum@db/curriculum".to_string(),
            ..curriculum_db()
        };
        assert!(long.validate().is_ok());

        let sqlite = DatabaseConfig {
            url: "sqlite://curriculum.db".to_string(),
            ..curriculum_db()
        };
        assert_eq!(sqlite.validate(), Err(ValidationError::InvalidDatabaseUrl));
    }

    #[test]
    fn blank_url_names_the_env_var() {
        let config = DatabaseConfig {
            url: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("CURRICULUM__DATABASE__URL"))
        );
    }

    #[test]
    fn pool_must_hold_at_least_one_connection() {
        let empty = DatabaseConfig {
            min_connections: 0,
            max_connections: 0,
            ..curriculum_db()
        };
        assert_eq!(empty.validate(), Err(ValidationError::InvalidPoolSize));

        let oversized = DatabaseConfig {
            max_connections: MAX_POOL_SIZE + 1,
            ..curriculum_db()
        };
        assert_eq!(oversized.validate(), Err(ValidationError::PoolSizeTooLarge));
    }
}
