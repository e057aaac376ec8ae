//! Core types: announcement classification, field extraction, date normalization

pub mod announcement;
pub mod classify;
pub mod error;
pub mod event;
pub mod extract;
pub mod normalize;
pub mod time;
pub mod tracing;

pub use announcement::{parse_announcement, parse_announcement_opt};
pub use classify::classify;
pub use error::{AnnouncementError, Field};
pub use event::{EventRecord, EventType, EVENT_DURATION_HOURS};
pub use extract::{extract, AnnouncementFields};
pub use normalize::{normalize_date_time, DATE_TIME_FORMAT};
pub use time::TimeWindow;
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
