//! Events imported from an external calendar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::appointment::{AppointmentId, ClientId, ServiceRef};
use crate::classify::Classification;
use crate::time::ClockTime;

/// Local identifier of an imported event.
pub type ExternalEventId = i64;

/// A provider event as stored locally after import.
///
/// `external_id` is the provider's identifier and the only key used to
/// deduplicate imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvent {
    pub id: ExternalEventId,
    pub external_id: String,
    pub calendar_name: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub classification: Classification,
    /// Once true, never reset by a later import.
    pub converted: bool,
    pub converted_appointment_id: Option<AppointmentId>,
}

impl ExternalEvent {
    /// Returns true if the event is waiting in the conversion queue.
    pub fn is_pending_work(&self) -> bool {
        self.classification.is_work() && !self.converted
    }

    /// Guesses the client name from the summary.
    ///
    /// Bookings are usually titled `"<what> - <who>"`, so the text after the
    /// last dash is taken. Summaries without a dash are returned whole.
    pub fn suggested_client_name(&self) -> String {
        match self.summary.rsplit_once('-') {
            Some((_, name)) => name.trim().to_string(),
            None => self.summary.trim().to_string(),
        }
    }
}

/// What the user fills in when converting an imported event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDraft {
    pub client_name: String,
    pub client_id: Option<ClientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceRef>,
    #[serde(default)]
    pub notes: String,
}

impl ConversionDraft {
    /// Prefills a draft from an event: the guessed client name and the
    /// event description as notes.
    pub fn suggest(event: &ExternalEvent) -> Self {
        Self {
            client_name: event.suggested_client_name(),
            client_id: None,
            service: None,
            notes: event.description.clone().unwrap_or_default(),
        }
    }
}

/// Counts reported after a calendar sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Events fetched across all calendars.
    pub total: usize,
    pub work_events: usize,
    /// Everything that is not work.
    pub regular_events: usize,
}

impl SyncSummary {
    /// Tallies classifications.
    pub fn tally<I>(classes: I) -> Self
    where
        I: IntoIterator<Item = Classification>,
    {
        classes.into_iter().fold(Self::default(), |mut acc, class| {
            acc.total += 1;
            if class.is_work() {
                acc.work_events += 1;
            } else {
                acc.regular_events += 1;
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(summary: &str) -> ExternalEvent {
        ExternalEvent {
            id: 1,
            external_id: "evt-1".to_string(),
            calendar_name: Some("Trabajo".to_string()),
            summary: summary.to_string(),
            description: None,
            date: NaiveDate::from_ymd_opt(2025, 12, 23).unwrap(),
            start_time: ClockTime::new(10, 0).unwrap(),
            end_time: ClockTime::new(11, 0).unwrap(),
            location: None,
            attendees: Vec::new(),
            classification: Classification::Work,
            converted: false,
            converted_appointment_id: None,
        }
    }

    #[test]
    fn client_name_after_last_dash() {
        assert_eq!(
            event("Cita - María García").suggested_client_name(),
            "María García"
        );
        assert_eq!(event("Corte - Tinte - Ana").suggested_client_name(), "Ana");
    }

    #[test]
    fn client_name_without_dash() {
        assert_eq!(event("  Laura  ").suggested_client_name(), "Laura");
    }

    #[test]
    fn draft_suggestion() {
        let mut e = event("Tinte - Laura");
        e.description = Some("Rubio ceniza".to_string());
        let draft = ConversionDraft::suggest(&e);
        assert_eq!(draft.client_name, "Laura");
        assert_eq!(draft.notes, "Rubio ceniza");
        assert_eq!(draft.service, None);

        let draft = ConversionDraft::suggest(&event("Laura"));
        assert_eq!(draft.notes, "");
    }

    #[test]
    fn summary_tally() {
        let summary = SyncSummary::tally([
            Classification::Work,
            Classification::Home,
            Classification::Medical,
            Classification::Work,
        ]);
        assert_eq!(
            summary,
            SyncSummary {
                total: 4,
                work_events: 2,
                regular_events: 2,
            }
        );
        assert_eq!(SyncSummary::tally(std::iter::empty()), SyncSummary::default());
    }

    #[test]
    fn pending_work() {
        let mut e = event("Cita - Ana");
        assert!(e.is_pending_work());
        e.converted = true;
        assert!(!e.is_pending_work());
        e.converted = false;
        e.classification = Classification::Medical;
        assert!(!e.is_pending_work());
    }
}
