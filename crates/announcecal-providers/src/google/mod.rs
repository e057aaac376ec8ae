//! Google Calendar provider.
//!
//! - OAuth 2.0 PKCE authorization with a loopback redirect ([`OAuthClient`])
//! - An explicit token session persisted as JSON ([`CalendarSession`])
//! - Duplicate lookup through `events.list` and creation through
//!   `events.insert` ([`GoogleProvider`])
//!
//! Users register their own desktop OAuth client in the Google Cloud
//! Console; `announcecal auth google` then runs the consent flow once and
//! stores the session for later imports.
//!
//! # Example
//!
//! ```ignore
//! use announcecal_providers::google::{CalendarSession, GoogleConfig, GoogleProvider, OAuthCredentials};
//!
//! let config = GoogleConfig::new(OAuthCredentials::from_file("client_secret.json")?);
//! let session = CalendarSession::load(&config.token_path)?;
//! let provider = GoogleProvider::new(config, session)?;
//!
//! if provider.needs_reauth() {
//!     provider.authenticate().await?;
//! }
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod session;

pub use client::{ApiEvent, EventDateTime, EventPayload, GoogleCalendarClient};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleProvider;
pub use session::{CalendarSession, TokenInfo};
