//! [`CalendarProvider`] implementation for Google Calendar.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::credential::Credential;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider, FetchOptions};
use crate::raw_event::RawEvent;

use super::client::GoogleCalendarClient;

/// Request timeout used when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only Google Calendar provider bound to one credential.
#[derive(Debug)]
pub struct GoogleProvider {
    client: GoogleCalendarClient,
}

impl GoogleProvider {
    /// Builds a provider for `credential`.
    ///
    /// Empty or already expired credentials are rejected up front with an
    /// authentication error so no request is made with them.
    pub fn new(credential: &Credential, timeout: Duration) -> ProviderResult<Self> {
        if credential.is_empty() {
            return Err(ProviderError::authentication("no access token").with_provider("google"));
        }
        if credential.is_expired_at(Utc::now()) {
            return Err(
                ProviderError::authentication("access token expired").with_provider("google"),
            );
        }

        let client = GoogleCalendarClient::new(&credential.access_token, timeout)?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: GoogleCalendarClient) -> Self {
        Self { client }
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(async move {
            let entries = self.client.list_calendars().await?;
            Ok(entries
                .into_iter()
                .map(|entry| {
                    let mut info = CalendarInfo::new(entry.id, entry.summary)
                        .with_primary(entry.primary);
                    info.timezone = entry.time_zone;
                    info
                })
                .collect())
        })
    }

    fn fetch_events<'a>(
        &'a self,
        calendar_id: &'a str,
        options: FetchOptions,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            debug!(calendar_id, time_min = %options.time_min, "fetching google events");
            self.client.list_events(calendar_id, &options).await
        })
    }
}
