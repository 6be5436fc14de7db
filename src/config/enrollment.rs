//! Enrollment channel configuration

use serde::Deserialize;

use super::error::ValidationError;

/// How learners are enrolled in the courses of an activated cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentConfig {
    /// Whether enrollment methods may be created on first use
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Name of the enrollment method in the host platform
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Role shortname given to enrolled learners
    #[serde(default = "default_role")]
    pub role: String,
}

impl EnrollmentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel.trim().is_empty() {
            return Err(ValidationError::BlankEnrollmentSetting("channel"));
        }
        if self.role.trim().is_empty() {
            return Err(ValidationError::BlankEnrollmentSetting("role"));
        }
        Ok(())
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            channel: default_channel(),
            role: default_role(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_channel() -> String {
    "curriculum".to_string()
}

fn default_role() -> String {
    "student".to_string()
}
