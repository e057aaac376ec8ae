//! Announcement classification.
//!
//! Classification is a case-insensitive substring search for each marker
//! phrase over the whole body, in priority order. The first marker found
//! decides the type.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::event::EventType;

/// Marker patterns in priority order.
static MARKERS: LazyLock<Vec<(Regex, EventType)>> = LazyLock::new(|| {
    EventType::ALL
        .iter()
        .map(|event_type| {
            let regex = RegexBuilder::new(&regex::escape(event_type.marker()))
                .case_insensitive(true)
                .build()
                .expect("Invalid marker regex");
            (regex, *event_type)
        })
        .collect()
});

/// Returns the event type announced by `text`, if any marker is present.
pub fn classify(text: &str) -> Option<EventType> {
    let found = MARKERS
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, event_type)| *event_type);

    match found {
        Some(event_type) => debug!(%event_type, "classified announcement"),
        None => debug!("no announcement marker matched"),
    }
    found
}
