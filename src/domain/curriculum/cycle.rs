//! Cycles (ordered stages of a version) and their course-matching items.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{CycleId, CycleItemId, ValidationError, VersionId};

/// Wildcard character accepted in course code patterns.
pub const COURSE_CODE_WILDCARD: char = '%';

/// An ordered stage within a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub version_id: VersionId,
    pub name: String,
    pub description: String,
    /// Days this stage lasts before the next one activates.
    pub duration_days: u32,
    /// Ordering key, not required to be contiguous.
    pub stage: i32,
}

impl Cycle {
    /// Total order of cycles inside a version: stage, then name.
    pub fn stage_order(&self, other: &Cycle) -> Ordering {
        self.stage
            .cmp(&other.stage)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Sorts cycles by (stage, name) in place.
pub fn sort_by_stage(cycles: &mut [Cycle]) {
    cycles.sort_by(Cycle::stage_order);
}

/// Returns the lowest (stage, name) cycle.
pub fn first_in_stage_order(cycles: &[Cycle]) -> Option<&Cycle> {
    cycles.iter().min_by(|a, b| a.stage_order(b))
}

/// A course-matching rule attached to a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleItem {
    pub id: CycleItemId,
    pub cycle_id: CycleId,
    pub course_code: CoursePattern,
    pub group_template: Option<String>,
    /// Eligibility conditions, stored but not evaluated by the engine.
    pub conditions: Option<JsonValue>,
    /// Informational validity in days.
    pub validity_days: u32,
}

/// A course code that is either exact or contains `%` wildcards.
///
/// `%` matches any run of characters (including none); every other
/// character is literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoursePattern(String);

impl CoursePattern {
    /// Creates a pattern, rejecting blank input.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            return Err(ValidationError::empty_field("course_code"));
        }
        Ok(Self(raw))
    }

    /// Returns the pattern text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the pattern contains at least one wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.0.contains(COURSE_CODE_WILDCARD)
    }

    /// Compiles the pattern into an anchored regular expression.
    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        let body = self
            .0
            .split(COURSE_CODE_WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        Regex::new(&format!("^{}$", body))
    }

    /// Checks a course idnumber against the pattern.
    pub fn matches(&self, idnumber: &str) -> bool {
        if !self.is_wildcard() {
            return self.0 == idnumber;
        }
        self.to_regex()
            .map(|re| re.is_match(idnumber))
            .unwrap_or(false)
    }

    /// Renders the pattern for a SQL `LIKE ... ESCAPE '\'` clause.
    ///
    /// `%` stays a wildcard; `_` and `\` are escaped so they match literally.
    pub fn to_sql_like(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + 4);
        for ch in self.0.chars() {
            match ch {
                '\\' | '_' => {
                    out.push('\\');
                    out.push(ch);
                }
                _ => out.push(ch),
            }
        }
        out
    }
}

impl fmt::Display for CoursePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CoursePattern {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CoursePattern> for String {
    fn from(pattern: CoursePattern) -> Self {
        pattern.0
    }
}
