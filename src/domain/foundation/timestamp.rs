//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use std::fmt;
use serde::{Deserialize, Serialize};

/// Seconds in one calendar day, as used by cycle durations.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Adds whole days, or `None` when the result is not representable.
    pub fn checked_plus_days(&self, days: u64) -> Option<Self> {
        self.0.checked_add_signed(days_to_duration(days)?).map(Self)
    }

    /// Subtracts whole days, or `None` when the result is not representable.
    pub fn checked_minus_days(&self, days: u64) -> Option<Self> {
        self.0.checked_sub_signed(days_to_duration(days)?).map(Self)
    }

    /// Creates a new timestamp by adding the specified number of whole days.
    ///
    /// Saturates at the latest representable instant.
    pub fn plus_days(&self, days: u64) -> Self {
        self.checked_plus_days(days)
            .unwrap_or(Self(DateTime::<Utc>::MAX_UTC))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    ///
    /// Saturates at the earliest representable instant.
    pub fn minus_days(&self, days: u64) -> Self {
        self.checked_minus_days(days)
            .unwrap_or(Self(DateTime::<Utc>::MIN_UTC))
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Out-of-range values clamp to the Unix epoch.
    pub fn from_unix_secs(secs: i64) -> Self {
        Self(
            Utc.timestamp_opt(secs, 0)
                .single()
                .unwrap_or_default(),
        )
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Reads an optional end timestamp where `0` means "not set".
    ///
    /// Legacy rows store open-ended dates as zero rather than NULL.
    pub fn from_optional_unix_secs(secs: Option<i64>) -> Option<Self> {
        match secs {
            Some(0) | None => None,
            Some(secs) => Some(Self::from_unix_secs(secs)),
        }
    }
}

fn days_to_duration(days: u64) -> Option<Duration> {
    let secs = i64::try_from(days).ok()?.checked_mul(SECONDS_PER_DAY)?;
    Duration::try_seconds(secs)
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}
