//! Field extraction from announcement bodies.
//!
//! An announcement carries its details on loosely formatted labeled lines:
//!
//! ```text
//! Date: Thursday, January 16th, 2025
//! Time: 10:00 AM
//! Location: Essex Hall, Room 101
//! ```
//!
//! Each field is located independently; the first match in the body wins.
//! The date and time phrases are then run through
//! [`normalize_date_time`](crate::normalize::normalize_date_time).

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{AnnouncementError, Field};
use crate::event::{EventRecord, EventType};
use crate::normalize::normalize_date_time;

/// Regex for the `Date:` line: `Weekday[,] Month[,] Day[ordinal][,] Year`.
static DATE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Date:\s*([A-Za-z]+,?\s+[A-Za-z]+,?\s+\d{1,2}(?i:st|nd|rd|th)?,?\s+\d{4})")
        .expect("Invalid date field regex")
});

/// Regex for the `Time:` line: `H[H]:MM` followed by a meridiem.
static TIME_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Time:\s*(\d{1,2}:\d{2}\s*(?:AM|PM|am|pm))").expect("Invalid time field regex")
});

/// Regex for the `Location:` line; the value runs to the end of the line.
static LOCATION_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Location:[ \t]*([^\n]*)").expect("Invalid location regex"));

/// The raw phrases located in a body, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementFields<'a> {
    pub date: &'a str,
    pub time: &'a str,
    pub location: &'a str,
}

impl<'a> AnnouncementFields<'a> {
    /// Locates the date, time and location phrases in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`AnnouncementError::FieldMissing`] for the first field, in
    /// date/time/location order, that cannot be found.
    pub fn locate(text: &'a str) -> Result<Self, AnnouncementError> {
        let date = find_date(text).ok_or(AnnouncementError::FieldMissing(Field::Date))?;
        let time = find_time(text).ok_or(AnnouncementError::FieldMissing(Field::Time))?;
        let location =
            find_location(text).ok_or(AnnouncementError::FieldMissing(Field::Location))?;

        debug!(date, time, location, "located announcement fields");
        Ok(Self {
            date,
            time,
            location,
        })
    }
}

/// Returns the date phrase of the first well-formed `Date:` line.
pub fn find_date(text: &str) -> Option<&str> {
    first_capture(&DATE_FIELD, text)
}

/// Returns the time phrase of the first well-formed `Time:` line.
pub fn find_time(text: &str) -> Option<&str> {
    first_capture(&TIME_FIELD, text)
}

/// Returns the trimmed value of the first non-empty `Location:` line.
pub fn find_location(text: &str) -> Option<&str> {
    LOCATION_FIELD
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|value| !value.is_empty())
}

fn first_capture<'t>(regex: &Regex, text: &'t str) -> Option<&'t str> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Extracts an [`EventRecord`] of the given type from `text`.
///
/// # Errors
///
/// - [`AnnouncementError::FieldMissing`] when a labeled line is absent
/// - [`AnnouncementError::DateParseFailure`] when the date/time phrase is
///   not a valid point in time
pub fn extract(text: &str, event_type: EventType) -> Result<EventRecord, AnnouncementError> {
    let fields = AnnouncementFields::locate(text)?;
    let start = normalize_date_time(fields.date, fields.time)?;
    EventRecord::new(event_type, fields.location, start)
}
