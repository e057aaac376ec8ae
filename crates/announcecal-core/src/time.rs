//! Time windows for calendar lookups.
//!
//! Duplicate detection asks the calendar for events starting close to an
//! extracted start time. [`TimeWindow`] describes that query range.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a window reaching `minutes` on either side of `center`.
    ///
    /// Negative values are treated as zero.
    pub fn around(center: DateTime<Utc>, minutes: i64) -> Self {
        let reach = Duration::minutes(minutes.max(0));
        Self {
            start: center - reach,
            end: center + reach,
        }
    }

    /// Creates a window around a wall-clock time in the given timezone.
    ///
    /// Ambiguous local times (DST fall-back) resolve to the earlier instant.
    /// Returns `None` for a local time skipped by a DST jump.
    pub fn around_local<Tz: TimeZone>(
        center: NaiveDateTime,
        tz: &Tz,
        minutes: i64,
    ) -> Option<Self> {
        let center = tz
            .from_local_datetime(&center)
            .earliest()?
            .with_timezone(&Utc);
        Some(Self::around(center, minutes))
    }

    /// Returns the duration of this window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true if the given datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        dt >= self.start && dt < self.end
    }
}
