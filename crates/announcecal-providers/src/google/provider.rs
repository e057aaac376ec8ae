//! [`CalendarProvider`] implementation for Google Calendar.

use announcecal_core::{EventRecord, TimeWindow};
use chrono::NaiveDateTime;
use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, CreatedEvent, summary_matches};

use super::client::{EventPayload, GoogleCalendarClient};
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::session::CalendarSession;

const PROVIDER_NAME: &str = "google";

/// Google Calendar provider.
///
/// Reads and writes a single calendar through the Calendar API v3. Tokens
/// come from the [`CalendarSession`] handed to [`GoogleProvider::new`].
pub struct GoogleProvider {
    config: GoogleConfig,
    session: CalendarSession,
    oauth_client: OAuthClient,
    api_client: TokioRwLock<Option<GoogleCalendarClient>>,
}

impl GoogleProvider {
    /// Creates a provider over an already loaded session. Does not contact
    /// Google.
    pub fn new(config: GoogleConfig, session: CalendarSession) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;
        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            session,
            oauth_client,
            api_client: TokioRwLock::new(None),
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    pub fn session(&self) -> &CalendarSession {
        &self.session
    }

    /// Runs the browser consent flow and stores the new tokens in the
    /// session.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");
        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;

        let client = GoogleCalendarClient::new(&tokens.access_token, &self.config)?;
        self.session.replace(tokens)?;
        *self.api_client.write().await = Some(client);

        info!("authentication successful");
        Ok(())
    }

    /// True when the session is missing or was granted different scopes.
    pub fn needs_reauth(&self) -> bool {
        self.session.needs_reauth(&self.config.scopes)
    }

    /// Makes sure the cached API client carries a live access token,
    /// refreshing the session when it has expired.
    async fn ensure_client(&self) -> ProviderResult<()> {
        let access_token = match self.session.access_token() {
            Some(token) => token,
            None if self.session.tokens().is_some() => {
                self.session.refresh(&self.oauth_client).await?
            }
            None => {
                return Err(ProviderError::authentication(
                    "not authenticated, run 'announcecal auth google'",
                ));
            }
        };

        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => c.set_access_token(access_token),
            None => *client = Some(GoogleCalendarClient::new(access_token, &self.config)?),
        }
        Ok(())
    }

    async fn lookup(
        &self,
        summary: &str,
        start: NaiveDateTime,
        window_minutes: i64,
    ) -> ProviderResult<bool> {
        let window = TimeWindow::around_local(start, &self.config.timezone, window_minutes)
            .ok_or_else(|| {
                ProviderError::calendar(format!(
                    "{} does not exist in {}",
                    start, self.config.timezone
                ))
            })?;

        self.ensure_client().await?;
        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let events = client
            .find_events(&self.config.calendar_id, &window, summary)
            .await?;
        let found = events
            .iter()
            .filter_map(|e| e.summary.as_deref())
            .any(|existing| summary_matches(existing, summary));

        debug!(summary, %start, candidates = events.len(), found, "duplicate lookup");
        Ok(found)
    }

    async fn insert(&self, record: &EventRecord) -> ProviderResult<CreatedEvent> {
        let payload = EventPayload::from_record(record, self.config.timezone.name());

        self.ensure_client().await?;
        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let inserted = client
            .insert_event(&self.config.calendar_id, &payload)
            .await?;

        info!(
            summary = record.summary(),
            start = %record.start(),
            id = inserted.id.as_deref().unwrap_or("?"),
            "created Google Calendar event"
        );
        Ok(CreatedEvent {
            id: inserted.id,
            html_link: inserted.html_link,
        })
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn exists_event<'a>(
        &'a self,
        summary: &'a str,
        start: NaiveDateTime,
        window_minutes: i64,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        Box::pin(async move {
            self.lookup(summary, start, window_minutes)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn create_event<'a>(
        &'a self,
        record: &'a EventRecord,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>> {
        Box::pin(async move {
            self.insert(record)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn is_authenticated(&self) -> bool {
        self.session.is_usable()
    }

    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            self.ensure_client()
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}
