//! In-memory calendar.
//!
//! Backs `--dry-run` imports and the pipeline tests. Lookups follow the
//! same overlap rule as the Google events list: an event is returned when
//! it ends after the window opens and starts before the window closes.

use std::sync::{Mutex, MutexGuard};

use announcecal_core::EventRecord;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{summary_matches, BoxFuture, CalendarProvider, CreatedEvent};

/// An event held by a [`MemoryCalendar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEvent {
    pub id: String,
    pub summary: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl StoredEvent {
    fn overlaps(&self, from: NaiveDateTime, to: NaiveDateTime) -> bool {
        self.end > from && self.start < to
    }
}

#[derive(Debug, Default)]
struct State {
    events: Vec<StoredEvent>,
    next_id: u64,
    create_error: Option<ProviderError>,
}

/// A calendar kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    state: Mutex<State>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing event.
    pub fn with_event(
        self,
        summary: impl Into<String>,
        start: NaiveDateTime,
        duration: Duration,
    ) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate_id();
            state.events.push(StoredEvent {
                id,
                summary: summary.into(),
                location: String::new(),
                start,
                end: start + duration,
            });
        }
        self
    }

    /// Makes every following `create_event` call fail with `error`.
    pub fn fail_creates_with(self, error: ProviderError) -> Self {
        self.lock().create_error = Some(error);
        self
    }

    /// Returns a snapshot of the stored events, in insertion order.
    pub fn events(&self) -> Vec<StoredEvent> {
        self.lock().events.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn contains(&self, summary: &str, start: NaiveDateTime, window_minutes: i64) -> bool {
        let reach = Duration::minutes(window_minutes.max(0));
        let (from, to) = (start - reach, start + reach);
        self.lock()
            .events
            .iter()
            .any(|event| event.overlaps(from, to) && summary_matches(&event.summary, summary))
    }

    fn insert(&self, record: &EventRecord) -> ProviderResult<CreatedEvent> {
        let mut state = self.lock();
        if let Some(ref error) = state.create_error {
            return Err(error.detached().with_provider("memory"));
        }

        let id = state.allocate_id();
        state.events.push(StoredEvent {
            id: id.clone(),
            summary: record.summary().to_string(),
            location: record.location().to_string(),
            start: record.start(),
            end: record.end(),
        });
        debug!(id, summary = record.summary(), "stored event in memory");
        Ok(CreatedEvent::new(id))
    }
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }
}

impl CalendarProvider for MemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    fn exists_event<'a>(
        &'a self,
        summary: &'a str,
        start: NaiveDateTime,
        window_minutes: i64,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        Box::pin(async move { Ok(self.contains(summary, start, window_minutes)) })
    }

    fn create_event<'a>(
        &'a self,
        record: &'a EventRecord,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>> {
        Box::pin(async move { self.insert(record) })
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}
