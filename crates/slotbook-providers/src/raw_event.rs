//! Provider-agnostic event data as fetched, before it is stored.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use slotbook_core::ClockTime;

/// Title used for events that come without one.
pub const UNTITLED_SUMMARY: &str = "Sin título";

/// When an event starts or ends.
///
/// Timed values keep the offset the provider reported so the local wall clock
/// can be recovered without knowing the server's timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEventTime {
    DateTime(DateTime<FixedOffset>),
    /// All-day event.
    Date(NaiveDate),
}

impl RawEventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// The calendar date in the event's own offset.
    pub fn wall_date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::Date(date) => *date,
        }
    }

    /// The wall-clock time in the event's own offset, or `all_day` for dates.
    pub fn wall_time_or(&self, all_day: ClockTime) -> ClockTime {
        match self {
            Self::DateTime(dt) => ClockTime::from_naive(dt.time()),
            Self::Date(_) => all_day,
        }
    }

    /// Parses a provider time given either an RFC 3339 timestamp or a
    /// `YYYY-MM-DD` date. The timestamp wins when both are present.
    pub fn parse(date_time: Option<&str>, date: Option<&str>) -> Option<Self> {
        match (date_time, date) {
            (Some(dt), _) => DateTime::parse_from_rfc3339(dt).ok().map(Self::DateTime),
            (None, Some(d)) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .ok()
                .map(Self::Date),
            (None, None) => None,
        }
    }
}

/// An event as returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Provider identifier, unique across calendars.
    pub id: String,
    pub calendar_id: String,
    /// Display name of the source calendar; drives classification.
    pub calendar_name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: RawEventTime,
    pub end: RawEventTime,
    /// Attendee email addresses.
    #[serde(default)]
    pub attendees: Vec<String>,
    pub status: Option<String>,
}

impl RawEvent {
    pub fn new(
        id: impl Into<String>,
        start: RawEventTime,
        end: RawEventTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            calendar_id: calendar_id.into(),
            calendar_name: None,
            summary: None,
            description: None,
            location: None,
            start,
            end,
            attendees: Vec::new(),
            status: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = Some(name.into());
        self
    }

    pub fn with_attendee(mut self, email: impl Into<String>) -> Self {
        self.attendees.push(email.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// The summary, or a placeholder when the provider sent none.
    pub fn title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNTITLED_SUMMARY)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_event_keeps_wall_clock() {
        let start = RawEventTime::parse(Some("2025-12-23T10:00:00+01:00"), None).unwrap();
        assert!(!start.is_all_day());
        assert_eq!(
            start.wall_date(),
            NaiveDate::from_ymd_opt(2025, 12, 23).unwrap()
        );
        assert_eq!(
            start.wall_time_or(ClockTime::start_of_day()),
            ClockTime::new(10, 0).unwrap()
        );
    }

    #[test]
    fn late_event_stays_on_local_date() {
        let start = RawEventTime::parse(Some("2025-12-23T00:30:00+01:00"), None).unwrap();
        assert_eq!(
            start.wall_date(),
            NaiveDate::from_ymd_opt(2025, 12, 23).unwrap()
        );
    }

    #[test]
    fn all_day_uses_fallback_time() {
        let start = RawEventTime::parse(None, Some("2025-12-24")).unwrap();
        assert!(start.is_all_day());
        assert_eq!(
            start.wall_time_or(ClockTime::end_of_day()),
            ClockTime::end_of_day()
        );
    }

    #[test]
    fn parse_rejects_missing_or_bad_values() {
        assert!(RawEventTime::parse(None, None).is_none());
        assert!(RawEventTime::parse(Some("yesterday"), None).is_none());
        assert!(RawEventTime::parse(None, Some("24/12/2025")).is_none());
    }

    #[test]
    fn builder_and_title() {
        let start = RawEventTime::Date(NaiveDate::from_ymd_opt(2025, 12, 24).unwrap());
        let event = RawEvent::new("evt-1", start.clone(), start, "cal-1")
            .with_calendar_name("Trabajo")
            .with_attendee("ana@example.com")
            .with_location("Salón");
        assert_eq!(event.title(), UNTITLED_SUMMARY);
        assert_eq!(event.attendees, vec!["ana@example.com".to_string()]);
        assert_eq!(event.calendar_name.as_deref(), Some("Trabajo"));

        let event = event.with_summary("Corte - Ana").with_status("cancelled");
        assert_eq!(event.title(), "Corte - Ana");
        assert!(event.is_cancelled());
    }
}
