//! Event types produced by announcement parsing.
//!
//! - [`EventType`]: the closed set of academic announcement kinds
//! - [`EventRecord`]: a validated event extracted from an announcement body

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{AnnouncementError, Field};

/// Length of every extracted event, in hours.
pub const EVENT_DURATION_HOURS: i64 = 1;

/// The kind of academic event an announcement describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "msc_thesis_proposal")]
    MScThesisProposal,
    #[serde(rename = "msc_thesis_defense")]
    MScThesisDefense,
    #[serde(rename = "phd_seminar")]
    PhDSeminar,
    #[serde(rename = "phd_comprehensive_exam")]
    PhDComprehensiveExam,
}

impl EventType {
    /// All event types, in classification priority order.
    pub const ALL: [EventType; 4] = [
        Self::MScThesisProposal,
        Self::MScThesisDefense,
        Self::PhDSeminar,
        Self::PhDComprehensiveExam,
    ];

    /// Returns the canonical label, used as the calendar event summary.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MScThesisProposal => "MSc Thesis Proposal",
            Self::MScThesisDefense => "MSc Thesis Defense",
            Self::PhDSeminar => "PhD Seminar",
            Self::PhDComprehensiveExam => "PhD Comprehensive Exam",
        }
    }

    /// Returns the literal phrase that identifies this type in a message body.
    ///
    /// The PhD announcements write the degree as `PhD.`, so their markers
    /// carry the period.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::MScThesisProposal => "MSc Thesis Proposal",
            Self::MScThesisDefense => "MSc Thesis Defense",
            Self::PhDSeminar => "PhD. Seminar",
            Self::PhDComprehensiveExam => "PhD. Comprehensive Exam",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated event extracted from an announcement.
///
/// Records are only built complete: the location is trimmed and non-empty
/// and `end` is always exactly [`EVENT_DURATION_HOURS`] after `start`. Times are
/// naive local calendar times; the timezone is attached by the calendar
/// provider when the event is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    event_type: EventType,
    location: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl EventRecord {
    /// Builds a record, trimming the location and deriving the end time.
    ///
    /// # Errors
    ///
    /// Returns [`AnnouncementError::FieldMissing`] for [`Field::Location`]
    /// when the location is empty after trimming.
    pub fn new(
        event_type: EventType,
        location: impl AsRef<str>,
        start: NaiveDateTime,
    ) -> Result<Self, AnnouncementError> {
        let location = location.as_ref().trim();
        if location.is_empty() {
            return Err(AnnouncementError::FieldMissing(Field::Location));
        }

        Ok(Self {
            event_type,
            location: location.to_string(),
            start,
            end: start + Duration::hours(EVENT_DURATION_HOURS),
        })
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The calendar summary for this event (its type label).
    pub fn summary(&self) -> &'static str {
        self.event_type.label()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Returns the duration of the event.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({} - {})",
            self.event_type,
            self.location,
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%H:%M")
        )
    }
}
