//! Google Calendar API v3 client.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::FetchOptions;
use crate::raw_event::{RawEvent, RawEventTime};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Thin HTTP client over the calendarList and events endpoints.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client")
                    .with_provider("google")
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Lists the calendars of the authenticated user.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        let list: CalendarListResponse = read_json(response).await?;
        debug!(count = list.items.len(), "listed calendars");
        Ok(list.items)
    }

    /// Lists events of one calendar, following pages until `max_results`.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        options: &FetchOptions,
    ) -> ProviderResult<Vec<RawEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, options, page_token.as_deref())
                .await?;

            events.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| convert_event(item, calendar_id)),
            );

            if events.len() >= options.max_results {
                events.truncate(options.max_results);
                break;
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(calendar_id, count = events.len(), "fetched events");
        Ok(events)
    }

    async fn list_events_page(
        &self,
        calendar_id: &str,
        options: &FetchOptions,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", options.time_min.to_rfc3339()),
                ("maxResults", options.max_results.to_string()),
                ("singleEvents", options.single_events.to_string()),
            ]);

        // orderBy=startTime is only accepted together with singleEvents.
        if options.single_events {
            request = request.query(&[("orderBy", "startTime")]);
        }
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(request_error)?;
        read_json(response).await
    }
}

fn request_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request failed: {e}")
    };
    ProviderError::network(message).with_provider("google")
}

/// Maps the status code to an error, then parses the body.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> ProviderResult<T> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(
            ProviderError::authentication("access token expired or invalid").with_provider("google"),
        );
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::authorization("access denied to calendar").with_provider("google"));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::rate_limited("rate limit exceeded").with_provider("google"));
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::not_found("calendar not found").with_provider("google"));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::server(format!("API error ({status}): {body}")).with_provider("google"));
    }

    let body = response.text().await.map_err(|e| {
        ProviderError::network(format!("failed to read response: {e}")).with_provider("google")
    })?;
    serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {e}"))
            .with_provider("google")
            .with_source(e)
    })
}

/// Converts an API event; cancelled or malformed events are dropped.
fn convert_event(event: ApiEvent, calendar_id: &str) -> Option<RawEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }
    let id = event.id?;

    let Some(start) = RawEventTime::parse(event.start.date_time.as_deref(), event.start.date.as_deref())
    else {
        warn!(event_id = %id, "event has no usable start time");
        return None;
    };
    let Some(end) = RawEventTime::parse(event.end.date_time.as_deref(), event.end.date.as_deref())
    else {
        warn!(event_id = %id, "event has no usable end time");
        return None;
    };

    let mut raw = RawEvent::new(id, start, end, calendar_id);
    raw.summary = event.summary;
    raw.description = event.description;
    raw.location = event.location;
    raw.status = event.status;
    raw.attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.email)
        .collect();
    Some(raw)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    // Cancelled instances come without times.
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    status: Option<String>,
    attendees: Option<Vec<ApiAttendee>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAttendee {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

/// An entry of the calendar list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub primary: bool,
    pub time_zone: Option<String>,
}
