//! CalendarProvider trait definition.
//!
//! A provider lists the calendars visible to a credential and fetches the
//! events of one calendar at a time. Fetching is read-only; nothing is ever
//! written back to the provider.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// Default page size when importing a calendar.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// A calendar visible to the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    pub id: String,
    /// Display name; classification of imported events is derived from it.
    pub name: String,
    pub is_primary: bool,
    /// IANA timezone identifier, when the provider reports one.
    pub timezone: Option<String>,
}

impl CalendarInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_primary: false,
            timezone: None,
        }
    }

    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Options for fetching the events of one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Lower bound on event start.
    pub time_min: DateTime<Utc>,
    pub max_results: usize,
    /// Expand recurring events into instances.
    pub single_events: bool,
}

impl FetchOptions {
    /// Events starting at or after `time_min`, single instances, at most
    /// [`DEFAULT_MAX_RESULTS`].
    pub fn since(time_min: DateTime<Utc>) -> Self {
        Self {
            time_min,
            max_results: DEFAULT_MAX_RESULTS,
            single_events: true,
        }
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// A boxed future so the trait stays object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of calendar events.
///
/// Implementations carry their own credential. Errors whose code is
/// authentication or authorization mean the credential must be renewed.
pub trait CalendarProvider: Send + Sync {
    /// Short provider name used in logs and errors, e.g. "google".
    fn name(&self) -> &str;

    /// Lists the calendars the credential can read.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>>;

    /// Fetches events of one calendar, ordered by start time.
    ///
    /// Returned events carry `calendar_id` but not necessarily
    /// `calendar_name`; callers that need the name attach it from
    /// [`CalendarInfo`].
    fn fetch_events<'a>(
        &'a self,
        calendar_id: &'a str,
        options: FetchOptions,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>>;
}
