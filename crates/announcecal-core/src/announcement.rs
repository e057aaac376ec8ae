//! One-call announcement parsing.
//!
//! ```text
//! body ──classify──▶ EventType ──extract──▶ EventRecord
//!   │                    │
//!   ▼                    ▼
//! ClassificationFailure  FieldMissing / DateParseFailure
//! ```

use tracing::debug;

use crate::classify::classify;
use crate::error::AnnouncementError;
use crate::event::EventRecord;
use crate::extract::extract;

/// Parses an announcement body into an event record.
///
/// Fails closed: a record is returned only when the body is classified and
/// every field is present and valid.
///
/// # Errors
///
/// - [`AnnouncementError::ClassificationFailure`] when no marker is present
/// - [`AnnouncementError::FieldMissing`] / [`AnnouncementError::DateParseFailure`]
///   when the body is classified but extraction fails
///
/// # Example
///
/// ```
/// use announcecal_core::{parse_announcement, EventType};
///
/// let body = "MSc Thesis Proposal\n\
///             Date: Thursday, January 16th, 2025\n\
///             Time: 10:00 AM\n\
///             Location: Essex Hall, Room 101\n";
///
/// let record = parse_announcement(body).unwrap();
/// assert_eq!(record.event_type(), EventType::MScThesisProposal);
/// assert_eq!(record.location(), "Essex Hall, Room 101");
/// ```
pub fn parse_announcement(text: &str) -> Result<EventRecord, AnnouncementError> {
    let event_type = classify(text).ok_or(AnnouncementError::ClassificationFailure)?;
    extract(text, event_type)
}

/// Like [`parse_announcement`], but collapses every failure to `None`.
pub fn parse_announcement_opt(text: &str) -> Option<EventRecord> {
    parse_announcement(text)
        .map_err(|e| debug!(kind = e.kind(), "announcement not parsed: {}", e))
        .ok()
}
