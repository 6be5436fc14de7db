//! Strongly-typed identifier value objects.
//!
//! Every curriculum record is keyed by an opaque integer assigned by the
//! store. The newtypes keep a `CycleId` from being passed where a
//! `VersionId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw store identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw store identifier.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse::<i64>()?))
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

integer_id!(
    /// Identifier of a curriculum program.
    ProgramId
);

integer_id!(
    /// Identifier of a program version.
    VersionId
);

integer_id!(
    /// Identifier of a cycle (stage) within a version.
    CycleId
);

integer_id!(
    /// Identifier of a course-matching item attached to a cycle.
    CycleItemId
);

integer_id!(
    /// Identifier of a learner-to-cycle assignment record.
    AssignmentId
);

integer_id!(
    /// Identifier of a learner (platform user).
    LearnerId
);

integer_id!(
    /// Identifier of a concrete course on the platform.
    CourseId
);
