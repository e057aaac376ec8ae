//! Google Calendar API v3 client.
//!
//! Thin wrapper over `events.list` and `events.insert`; authentication is
//! the caller's business, this client only attaches the bearer token.

use announcecal_core::{EventRecord, TimeWindow};
use chrono::{NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;

/// Page size requested from `events.list`.
const PAGE_SIZE: usize = 250;

/// Local wall-clock format the API expects next to an explicit `timeZone`.
const LOCAL_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl GoogleCalendarClient {
    pub fn new(access_token: impl Into<String>, config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            api_base: config.api_base.clone(),
        })
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    /// Lists the live events overlapping `window` that match the free-text
    /// `query`, following every result page.
    pub async fn find_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        query: &str,
    ) -> ProviderResult<Vec<ApiEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .find_events_page(calendar_id, window, query, page_token.as_deref())
                .await?;

            events.extend(page.items.into_iter().filter(|e| !e.is_cancelled()));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            calendar_id,
            query,
            count = events.len(),
            "listed candidate events"
        );
        Ok(events)
    }

    async fn find_events_page(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        query: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let mut request = self
            .http_client
            .get(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .query(&[
                (
                    "timeMin",
                    window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                (
                    "timeMax",
                    window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("q", query.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = check_status(request.send().await.map_err(transport_error)?).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse event list: {}", e))
        })
    }

    /// Creates an event and returns the API's view of it.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> ProviderResult<ApiEvent> {
        let response = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse inserted event: {}", e))
        })
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Maps a non-success status to the matching [`ProviderError`].
async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        reqwest::StatusCode::UNAUTHORIZED => Err(ProviderError::authentication(
            "access token expired or invalid",
        )),
        reqwest::StatusCode::FORBIDDEN => Err(ProviderError::authorization(
            "access denied to calendar",
        )),
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::server(format!(
                "API error ({}): {}",
                status, body
            )))
        }
    }
}

/// Request body for `events.insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPayload {
    pub summary: String,
    pub location: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

/// A wall-clock time paired with the IANA zone it is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl EventDateTime {
    fn local(at: NaiveDateTime, time_zone: &str) -> Self {
        Self {
            date_time: at.format(LOCAL_DATE_TIME).to_string(),
            time_zone: time_zone.to_string(),
        }
    }
}

impl EventPayload {
    pub fn from_record(record: &EventRecord, time_zone: &str) -> Self {
        Self {
            summary: record.summary().to_string(),
            location: record.location().to_string(),
            start: EventDateTime::local(record.start(), time_zone),
            end: EventDateTime::local(record.end(), time_zone),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// The subset of an API event the importer looks at.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub html_link: Option<String>,
}

impl ApiEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::config::OAuthCredentials;
    use announcecal_core::EventType;
    use chrono::{NaiveDate, TimeZone, Utc};
    use mockito::{Matcher, Server};

    fn record() -> EventRecord {
        let start = NaiveDate::from_ymd_opt(2025, 1, 16)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        EventRecord::new(EventType::MScThesisProposal, "Essex Hall, Room 101", start).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 16, 14, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 16, 15, 1, 0).unwrap(),
        )
    }

    fn client(base: &str) -> GoogleCalendarClient {
        let config = GoogleConfig::new(OAuthCredentials::new(
            "test.apps.googleusercontent.com",
            "secret",
        ))
        .with_api_base(base);
        GoogleCalendarClient::new("test-token", &config).unwrap()
    }

    mod payload {
        use super::*;

        #[test]
        fn insert_body_shape() {
            let payload = EventPayload::from_record(&record(), "America/Toronto");
            assert_eq!(
                serde_json::to_value(&payload).unwrap(),
                serde_json::json!({
                    "summary": "MSc Thesis Proposal",
                    "location": "Essex Hall, Room 101",
                    "start": {"dateTime": "2025-01-16T10:00:00", "timeZone": "America/Toronto"},
                    "end": {"dateTime": "2025-01-16T11:00:00", "timeZone": "America/Toronto"},
                })
            );
        }

        #[test]
        fn list_response_parses() {
            let json = r#"{
                "items": [
                    {"id": "a", "summary": "MSc Thesis Proposal", "status": "confirmed"},
                    {"id": "b", "status": "cancelled"}
                ],
                "nextPageToken": "page-2"
            }"#;
            let page: EventListResponse = serde_json::from_str(json).unwrap();
            assert_eq!(page.items.len(), 2);
            assert!(!page.items[0].is_cancelled());
            assert!(page.items[1].is_cancelled());
            assert!(page.items[1].summary.is_none());
            assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
        }

        #[test]
        fn calendar_id_is_path_encoded() {
            let client = client("https://example.test");
            assert_eq!(
                client.events_url("grads@group.calendar.google.com"),
                "https://example.test/calendars/grads%40group.calendar.google.com/events"
            );
        }
    }

    mod http {
        use super::*;

        #[tokio::test]
        async fn find_events_sends_lookup_query() {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("GET", Matcher::Regex(r"^/calendars/primary/events".to_string()))
                .match_header("authorization", "Bearer test-token")
                .match_query(Matcher::AllOf(vec![
                    Matcher::UrlEncoded("timeMin".into(), "2025-01-16T14:59:00Z".into()),
                    Matcher::UrlEncoded("timeMax".into(), "2025-01-16T15:01:00Z".into()),
                    Matcher::UrlEncoded("q".into(), "MSc Thesis Proposal".into()),
                    Matcher::UrlEncoded("singleEvents".into(), "true".into()),
                    Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
                ]))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(
                    r#"{"items": [
                        {"id": "a", "summary": "MSc Thesis Proposal", "status": "confirmed"},
                        {"id": "b", "summary": "MSc Thesis Proposal", "status": "cancelled"}
                    ]}"#,
                )
                .create_async()
                .await;

            let events = client(&server.url())
                .find_events("primary", &window(), "MSc Thesis Proposal")
                .await
                .unwrap();

            mock.assert_async().await;
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].id.as_deref(), Some("a"));
        }

        #[tokio::test]
        async fn insert_event_posts_payload() {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("POST", "/calendars/primary/events")
                .match_header("authorization", "Bearer test-token")
                .match_body(Matcher::PartialJson(serde_json::json!({
                    "summary": "MSc Thesis Proposal",
                    "start": {"dateTime": "2025-01-16T10:00:00", "timeZone": "America/Toronto"},
                })))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(
                    r#"{"id": "evt-1", "status": "confirmed",
                        "htmlLink": "https://calendar.google.com/event?eid=evt-1"}"#,
                )
                .create_async()
                .await;

            let payload = EventPayload::from_record(&record(), "America/Toronto");
            let created = client(&server.url())
                .insert_event("primary", &payload)
                .await
                .unwrap();

            mock.assert_async().await;
            assert_eq!(created.id.as_deref(), Some("evt-1"));
            assert_eq!(
                created.html_link.as_deref(),
                Some("https://calendar.google.com/event?eid=evt-1")
            );
        }

        async fn status_error(status: usize, headers: &[(&str, &str)]) -> ProviderError {
            let mut server = Server::new_async().await;
            let mut mock = server
                .mock("POST", "/calendars/primary/events")
                .with_status(status)
                .with_body("nope");
            for (name, value) in headers {
                mock = mock.with_header(*name, *value);
            }
            let _mock = mock.create_async().await;

            let payload = EventPayload::from_record(&record(), "America/Toronto");
            client(&server.url())
                .insert_event("primary", &payload)
                .await
                .unwrap_err()
        }

        #[tokio::test]
        async fn status_mapping() {
            assert_eq!(
                status_error(401, &[]).await.code(),
                ProviderErrorCode::AuthenticationFailed
            );
            assert_eq!(
                status_error(403, &[]).await.code(),
                ProviderErrorCode::AuthorizationFailed
            );

            let limited = status_error(429, &[("retry-after", "30")]).await;
            assert_eq!(limited.code(), ProviderErrorCode::RateLimited);
            assert!(limited.message().contains("retry after 30 seconds"));

            let server = status_error(500, &[]).await;
            assert_eq!(server.code(), ProviderErrorCode::ServerError);
            assert!(server.message().contains("nope"));
        }

        #[tokio::test]
        async fn garbage_body_is_invalid_response() {
            let mut server = Server::new_async().await;
            let _mock = server
                .mock("POST", "/calendars/primary/events")
                .with_status(200)
                .with_body("<html>")
                .create_async()
                .await;

            let payload = EventPayload::from_record(&record(), "America/Toronto");
            let err = client(&server.url())
                .insert_event("primary", &payload)
                .await
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        }
    }
}
