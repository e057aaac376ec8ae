//! Calendar backends for announcecal.
//!
//! - [`CalendarProvider`] - duplicate lookup and event creation, object-safe
//! - [`google::GoogleProvider`] - Google Calendar API v3 (feature `google`)
//! - [`MemoryCalendar`] - in-memory calendar for dry runs and tests
//! - [`ErrorProvider`] - stands in for a provider that failed to start
//!
//! ```text
//! EventRecord ──exists_event?──▶ CalendarProvider ──create_event──▶ CreatedEvent
//!                                   │        │
//!                          GoogleProvider  MemoryCalendar
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::{MemoryCalendar, StoredEvent};
pub use provider::{BoxFuture, CalendarProvider, CreatedEvent, ErrorProvider, summary_matches};
