//! Error types for announcement parsing.

use std::fmt;

use thiserror::Error;

/// A labeled field the extractor looks for in an announcement body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The `Date:` line.
    Date,
    /// The `Time:` line.
    Time,
    /// The `Location:` line.
    Location,
}

impl Field {
    /// Returns the label as written in announcements, without the colon.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Time => "Time",
            Self::Location => "Location",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why an announcement body did not produce an event record.
///
/// None of these are fatal: callers processing a batch skip the input and
/// move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnouncementError {
    /// The body contains none of the known announcement markers.
    #[error("no known announcement marker found")]
    ClassificationFailure,

    /// The body was classified but a labeled field could not be located.
    #[error("missing or malformed '{0}:' line")]
    FieldMissing(Field),

    /// All fields were found but the date/time phrase did not parse.
    #[error("could not parse date/time '{phrase}': {reason}")]
    DateParseFailure {
        /// The normalized phrase handed to the strict parser.
        phrase: String,
        /// What the strict parser rejected.
        reason: String,
    },
}

impl AnnouncementError {
    pub(crate) fn date_parse(phrase: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::DateParseFailure {
            phrase: phrase.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true when the body was recognised as an announcement but
    /// extraction failed afterwards.
    pub fn is_extraction_failure(&self) -> bool {
        !matches!(self, Self::ClassificationFailure)
    }

    /// Short machine-friendly category name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClassificationFailure => "classification_failure",
            Self::FieldMissing(_) => "field_missing",
            Self::DateParseFailure { .. } => "date_parse_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            AnnouncementError::ClassificationFailure.to_string(),
            "no known announcement marker found"
        );
        assert_eq!(
            AnnouncementError::FieldMissing(Field::Time).to_string(),
            "missing or malformed 'Time:' line"
        );
        let err = AnnouncementError::date_parse("Monday January 16 2025 10:00 AM", "impossible");
        assert_eq!(
            err.to_string(),
            "could not parse date/time 'Monday January 16 2025 10:00 AM': impossible"
        );
    }

    #[test]
    fn extraction_failure_split() {
        assert!(!AnnouncementError::ClassificationFailure.is_extraction_failure());
        assert!(AnnouncementError::FieldMissing(Field::Date).is_extraction_failure());
        assert!(AnnouncementError::date_parse("x", "y").is_extraction_failure());
    }

    #[test]
    fn kinds() {
        assert_eq!(
            AnnouncementError::FieldMissing(Field::Location).kind(),
            "field_missing"
        );
        assert_eq!(
            AnnouncementError::date_parse("x", "y").kind(),
            "date_parse_failure"
        );
    }
}
