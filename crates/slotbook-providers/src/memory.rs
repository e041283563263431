//! In-memory calendar provider.
//!
//! Serves a fixed set of calendars and events. Used by tests and by the
//! server's demo mode; individual calendars, or the calendar list itself,
//! can be made to fail.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider, FetchOptions};
use crate::raw_event::{RawEvent, RawEventTime};

#[derive(Debug)]
struct MemoryCalendar {
    info: CalendarInfo,
    events: Vec<RawEvent>,
    failure: Option<(ProviderErrorCode, String)>,
}

/// A provider backed by vectors.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    calendars: Vec<MemoryCalendar>,
    list_failure: Option<(ProviderErrorCode, String)>,
    fetches: Mutex<Vec<(String, FetchOptions)>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a calendar with its events.
    pub fn with_calendar(mut self, info: CalendarInfo, events: Vec<RawEvent>) -> Self {
        self.calendars.push(MemoryCalendar {
            info,
            events,
            failure: None,
        });
        self
    }

    /// Adds a calendar whose fetch always fails.
    pub fn with_failing_calendar(
        mut self,
        info: CalendarInfo,
        code: ProviderErrorCode,
        message: impl Into<String>,
    ) -> Self {
        self.calendars.push(MemoryCalendar {
            info,
            events: Vec::new(),
            failure: Some((code, message.into())),
        });
        self
    }

    /// Makes `list_calendars` fail.
    pub fn failing_list(mut self, code: ProviderErrorCode, message: impl Into<String>) -> Self {
        self.list_failure = Some((code, message.into()));
        self
    }

    /// Every fetch made so far, in order.
    pub fn fetches(&self) -> Vec<(String, FetchOptions)> {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn error(&self, code: ProviderErrorCode, message: &str) -> ProviderError {
        ProviderError::new(code, message).with_provider(self.name())
    }
}

fn start_instant(time: &RawEventTime) -> DateTime<Utc> {
    match time {
        RawEventTime::DateTime(dt) => dt.with_timezone(&Utc),
        RawEventTime::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
    }
}

impl CalendarProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        let result = match &self.list_failure {
            Some((code, message)) => Err(self.error(*code, message)),
            None => Ok(self.calendars.iter().map(|c| c.info.clone()).collect()),
        };
        Box::pin(async move { result })
    }

    fn fetch_events<'a>(
        &'a self,
        calendar_id: &'a str,
        options: FetchOptions,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((calendar_id.to_string(), options.clone()));

        let result = match self.calendars.iter().find(|c| c.info.id == calendar_id) {
            None => Err(self.error(
                ProviderErrorCode::NotFound,
                &format!("calendar {calendar_id} not found"),
            )),
            Some(MemoryCalendar {
                failure: Some((code, message)),
                ..
            }) => Err(self.error(*code, message)),
            Some(calendar) => {
                let mut events: Vec<RawEvent> = calendar
                    .events
                    .iter()
                    .filter(|e| start_instant(&e.start) >= options.time_min)
                    .cloned()
                    .collect();
                events.sort_by_key(|e| start_instant(&e.start));
                events.truncate(options.max_results);
                Ok(events)
            }
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timed(id: &str, rfc3339: &str) -> RawEvent {
        let start = RawEventTime::parse(Some(rfc3339), None).unwrap();
        RawEvent::new(id, start.clone(), start, "work")
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn lists_calendars() {
        let provider = MemoryProvider::new()
            .with_calendar(CalendarInfo::new("work", "Trabajo"), vec![])
            .with_calendar(CalendarInfo::new("home", "Casa"), vec![]);
        let calendars = provider.list_calendars().await.unwrap();
        let names: Vec<_> = calendars.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Trabajo", "Casa"]);
    }

    #[tokio::test]
    async fn filters_sorts_and_truncates() {
        let provider = MemoryProvider::new().with_calendar(
            CalendarInfo::new("work", "Trabajo"),
            vec![
                timed("late", "2025-12-20T10:00:00+01:00"),
                timed("old", "2025-11-20T10:00:00+01:00"),
                timed("early", "2025-12-02T10:00:00+01:00"),
                timed("mid", "2025-12-10T10:00:00+01:00"),
            ],
        );

        let events = provider
            .fetch_events("work", FetchOptions::since(since()).with_max_results(2))
            .await
            .unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["early", "mid"]);

        let fetches = provider.fetches();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].0, "work");
        assert_eq!(fetches[0].1.time_min, since());
    }

    #[tokio::test]
    async fn failing_calendar_and_list() {
        let provider = MemoryProvider::new().with_failing_calendar(
            CalendarInfo::new("broken", "Trabajo"),
            ProviderErrorCode::ServerError,
            "boom",
        );
        let err = provider
            .fetch_events("broken", FetchOptions::since(since()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.provider(), Some("memory"));

        let err = provider
            .fetch_events("missing", FetchOptions::since(since()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);

        let provider = provider.failing_list(ProviderErrorCode::AuthenticationFailed, "expired");
        let err = provider.list_calendars().await.unwrap_err();
        assert!(err.is_auth());
    }
}
