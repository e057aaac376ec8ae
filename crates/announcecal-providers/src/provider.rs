//! CalendarProvider trait definition.
//!
//! A provider answers two questions for the import pipeline: is this event
//! already on the calendar, and can it be added.

use std::future::Future;
use std::pin::Pin;

use announcecal_core::EventRecord;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{ProviderError, ProviderResult};

/// A boxed future for async trait methods.
///
/// Keeps [`CalendarProvider`] object-safe so the client can hold a
/// `Box<dyn CalendarProvider>` chosen at runtime.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An event accepted by a calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreatedEvent {
    /// Provider-assigned identifier.
    pub id: Option<String>,
    /// Link to the event in the calendar's web UI.
    pub html_link: Option<String>,
}

impl CreatedEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            html_link: None,
        }
    }

    pub fn with_html_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }
}

/// Returns true if an existing event titled `existing` counts as a
/// duplicate of an event titled `wanted`.
///
/// The comparison is a case-insensitive substring match, so an event the
/// user renamed to "MSc Thesis Defense - A. Johnson" still matches.
pub fn summary_matches(existing: &str, wanted: &str) -> bool {
    existing.to_lowercase().contains(&wanted.to_lowercase())
}

/// The core abstraction for calendar backends.
///
/// Start times are wall-clock times; each provider decides which timezone
/// they are expressed in.
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g., "google", "memory").
    fn name(&self) -> &str;

    /// Returns true if the calendar already holds an event whose summary
    /// contains `summary` (case-insensitive) and which starts within
    /// `window_minutes` of `start`.
    fn exists_event<'a>(
        &'a self,
        summary: &'a str,
        start: NaiveDateTime,
        window_minutes: i64,
    ) -> BoxFuture<'a, ProviderResult<bool>>;

    /// Adds the event to the calendar.
    fn create_event<'a>(
        &'a self,
        record: &'a EventRecord,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>>;

    /// Checks if the provider holds usable credentials.
    fn is_authenticated(&self) -> bool;

    /// Refreshes the authentication tokens.
    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Duplicate check for a parsed record.
    fn is_duplicate<'a>(
        &'a self,
        record: &'a EventRecord,
        window_minutes: i64,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        self.exists_event(record.summary(), record.start(), window_minutes)
    }
}

/// A provider that always returns an error.
///
/// Stands in for a provider that failed to initialize, so the failure is
/// reported per file instead of aborting a batch.
#[derive(Debug)]
pub struct ErrorProvider {
    name: String,
    error: ProviderError,
}

impl ErrorProvider {
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        let name = name.into();
        let error = error.with_provider(name.clone());
        Self { name, error }
    }
}

impl CalendarProvider for ErrorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists_event<'a>(
        &'a self,
        _summary: &'a str,
        _start: NaiveDateTime,
        _window_minutes: i64,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        let error = self.error.detached();
        Box::pin(async move { Err(error) })
    }

    fn create_event<'a>(
        &'a self,
        _record: &'a EventRecord,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>> {
        let error = self.error.detached();
        Box::pin(async move { Err(error) })
    }

    fn is_authenticated(&self) -> bool {
        false
    }

    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>> {
        let error = self.error.detached();
        Box::pin(async move { Err(error) })
    }
}
