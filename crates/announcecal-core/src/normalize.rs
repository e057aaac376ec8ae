//! Date/time phrase normalization.
//!
//! Announcement dates are hand-written (`Thursday, January 16th, 2025`), so
//! they go through a fixed pipeline before parsing:
//!
//! 1. [`join_phrase`] - date and time phrases joined by one space
//! 2. [`strip_ordinals`] - `16th` becomes `16`
//! 3. [`strip_commas`] - every comma removed
//! 4. [`parse_strict`] - parsed against [`DATE_TIME_FORMAT`]
//!
//! Each stage is a plain function so it can be tested on its own.
//!
//! # Example
//!
//! ```
//! use announcecal_core::normalize::normalize_date_time;
//!
//! let start = normalize_date_time("Thursday, January 16th, 2025", "10:00 AM").unwrap();
//! assert_eq!(start.to_string(), "2025-01-16 10:00:00");
//! ```

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::AnnouncementError;

/// The only accepted shape of a normalized phrase,
/// e.g. `Thursday January 16 2025 10:00 AM`.
pub const DATE_TIME_FORMAT: &str = "%A %B %d %Y %I:%M %p";

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Regex for a digit run followed by an English ordinal suffix.
static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)(?:st|nd|rd|th)").expect("Invalid ordinal regex"));

/// Regex for a 12-hour clock, with the meridiem optionally glued on.
static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}:\d{2})((?i:am|pm))?$").expect("Invalid clock regex")
});

/// Joins the date and time phrases with a single space.
pub fn join_phrase(date: &str, time: &str) -> String {
    format!("{} {}", date.trim(), time.trim())
}

/// Removes ordinal suffixes from numbers (`1st`, `22nd`, `3RD`, `16th`).
pub fn strip_ordinals(phrase: &str) -> String {
    ORDINAL_SUFFIX.replace_all(phrase, "$1").into_owned()
}

/// Removes every comma.
pub fn strip_commas(phrase: &str) -> String {
    phrase.replace(',', "")
}

/// Parses a normalized phrase against [`DATE_TIME_FORMAT`].
///
/// Weekday and month names must be written in full. The weekday must agree
/// with the date; it is never corrected.
///
/// # Errors
///
/// Returns [`AnnouncementError::DateParseFailure`] on any deviation from the
/// format.
pub fn parse_strict(phrase: &str) -> Result<NaiveDateTime, AnnouncementError> {
    let canonical = canonicalize(phrase)?;
    NaiveDateTime::parse_from_str(&canonical, DATE_TIME_FORMAT)
        .map_err(|e| AnnouncementError::date_parse(phrase, e))
}

/// Runs the whole pipeline over a raw date phrase and time phrase.
///
/// # Errors
///
/// Returns [`AnnouncementError::DateParseFailure`] when the normalized
/// phrase does not parse.
pub fn normalize_date_time(date: &str, time: &str) -> Result<NaiveDateTime, AnnouncementError> {
    let phrase = strip_commas(&strip_ordinals(&join_phrase(date, time)));
    parse_strict(&phrase)
}

/// Splits a phrase into its six components and reassembles it with single
/// spaces, rejecting abbreviated names and malformed numbers.
fn canonicalize(phrase: &str) -> Result<String, AnnouncementError> {
    let fail = |reason: &str| AnnouncementError::date_parse(phrase, reason);

    let mut tokens: Vec<&str> = phrase.split_whitespace().collect();

    // "10:00AM" carries its meridiem; split it off so both spellings agree.
    if tokens.len() == 5 {
        let clock = tokens[4];
        let caps = CLOCK.captures(clock).ok_or_else(|| fail("invalid time"))?;
        match (caps.get(1), caps.get(2)) {
            (Some(hm), Some(meridiem)) => {
                tokens[4] = hm.as_str();
                tokens.push(meridiem.as_str());
            }
            _ => return Err(fail("missing AM/PM")),
        }
    }

    let [weekday, month, day, year, clock, meridiem] = tokens[..] else {
        return Err(fail("expected 'Weekday Month Day Year HH:MM AM/PM'"));
    };

    if !WEEKDAYS.iter().any(|w| w.eq_ignore_ascii_case(weekday)) {
        return Err(fail("weekday must be a full English day name"));
    }
    if !MONTHS.iter().any(|m| m.eq_ignore_ascii_case(month)) {
        return Err(fail("month must be a full English month name"));
    }
    if !(1..=2).contains(&day.len()) || !day.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail("day must be one or two digits"));
    }
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail("year must be four digits"));
    }
    match CLOCK.captures(clock) {
        Some(caps) if caps.get(2).is_none() => {}
        _ => return Err(fail("invalid time")),
    }
    if !meridiem.eq_ignore_ascii_case("am") && !meridiem.eq_ignore_ascii_case("pm") {
        return Err(fail("missing AM/PM"));
    }

    Ok(format!(
        "{weekday} {month} {day} {year} {clock} {}",
        meridiem.to_ascii_uppercase()
    ))
}
