use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Microseconds since the Unix epoch. Travels as
/// `{ __timestamp_micros_since_unix_epoch__: i64 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    micros: i64,
}

impl Timestamp {
    pub const UNIX_EPOCH: Timestamp = Timestamp { micros: 0 };

    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub const fn micros(&self) -> i64 {
        self.micros
    }

    pub fn now() -> Self {
        Self::from_micros(Utc::now().timestamp_micros())
    }

    /// `None` when the value is outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_micros(self.micros).single()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}µs", self.micros),
        }
    }
}

/// Signed span of microseconds. Travels as `{ __time_duration_micros__: i64 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimeDuration {
    micros: i64,
}

impl TimeDuration {
    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub const fn micros(&self) -> i64 {
        self.micros
    }

    /// Negative spans clamp to zero.
    pub fn to_std(&self) -> Duration {
        Duration::from_micros(self.micros.max(0) as u64)
    }
}

impl From<Duration> for TimeDuration {
    fn from(d: Duration) -> Self {
        Self::from_micros(i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for TimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}µs", self.micros)
    }
}
