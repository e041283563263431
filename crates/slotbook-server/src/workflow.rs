//! Calendar sync and conversion of imported events into appointments.
//!
//! The workflow keeps no state of its own between calls: callers list
//! [`ConversionWorkflow::pending`] and convert or skip one event at a time
//! until the list is empty.

use std::sync::Arc;
#[cfg(feature = "google")]
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use slotbook_core::{
    Appointment, AppointmentId, ConversionDraft, ExternalEvent, ExternalEventId, NewAppointment,
    SyncSummary, slot_id_for, sync_window_start,
};
use slotbook_providers::{CalendarProvider, Credential, FetchOptions, ProviderResult};

use crate::cursor::SyncCursorStore;
use crate::db::{Database, run_blocking};
use crate::error::{EngineError, EngineResult};
use crate::external::{self, ExternalEventStore};
use crate::ledger;
use crate::slots::BookingPolicy;

/// Builds a provider for a credential.
pub trait ProviderFactory: Send + Sync {
    fn connect(&self, credential: &Credential) -> ProviderResult<Arc<dyn CalendarProvider>>;
}

/// Connects to Google Calendar.
#[cfg(feature = "google")]
#[derive(Debug, Clone)]
pub struct GoogleProviderFactory {
    timeout: Duration,
}

#[cfg(feature = "google")]
impl GoogleProviderFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[cfg(feature = "google")]
impl Default for GoogleProviderFactory {
    fn default() -> Self {
        Self::new(slotbook_providers::google::DEFAULT_TIMEOUT)
    }
}

#[cfg(feature = "google")]
impl ProviderFactory for GoogleProviderFactory {
    fn connect(&self, credential: &Credential) -> ProviderResult<Arc<dyn CalendarProvider>> {
        let provider = slotbook_providers::google::GoogleProvider::new(credential, self.timeout)?;
        Ok(Arc::new(provider))
    }
}

/// Hands out the same provider whatever the credential.
#[derive(Clone)]
pub struct FixedProviderFactory(Arc<dyn CalendarProvider>);

impl FixedProviderFactory {
    pub fn new(provider: impl CalendarProvider + 'static) -> Self {
        Self(Arc::new(provider))
    }
}

impl ProviderFactory for FixedProviderFactory {
    fn connect(&self, _credential: &Credential) -> ProviderResult<Arc<dyn CalendarProvider>> {
        Ok(Arc::clone(&self.0))
    }
}

/// Drives sync, conversion and skipping.
#[derive(Clone)]
pub struct ConversionWorkflow {
    db: Database,
    events: ExternalEventStore,
    cursor: SyncCursorStore,
    providers: Arc<dyn ProviderFactory>,
    policy: BookingPolicy,
}

impl ConversionWorkflow {
    pub fn new(db: Database, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            events: ExternalEventStore::new(db.clone()),
            cursor: SyncCursorStore::new(db.clone()),
            db,
            providers,
            policy: BookingPolicy::default(),
        }
    }

    /// Booking policy used when a conversion lands on a taken slot.
    pub fn with_booking_policy(mut self, policy: BookingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Imports events from every calendar visible to `credential`.
    ///
    /// Starts from the last sync, or 30 days back on the first run.
    /// Listing calendars must succeed; after that a failing calendar is
    /// logged and skipped and the cursor advances regardless.
    #[instrument(skip_all)]
    pub async fn sync(&self, credential: &Credential) -> EngineResult<SyncSummary> {
        if credential.is_empty() {
            return Err(EngineError::UpstreamAuth(
                "no calendar credential available".to_string(),
            ));
        }

        let store = self.cursor.clone();
        let cursor = run_blocking(move || store.load()).await?;
        let time_min = sync_window_start(cursor.last_sync_at, Utc::now());
        let provider = self.providers.connect(credential)?;
        let calendars = provider.list_calendars().await?;
        info!(
            provider = provider.name(),
            calendars = calendars.len(),
            %time_min,
            "syncing calendars"
        );

        let mut batch = Vec::new();
        for calendar in &calendars {
            match provider
                .fetch_events(&calendar.id, FetchOptions::since(time_min))
                .await
            {
                Ok(events) => batch.extend(
                    events
                        .into_iter()
                        .map(|e| e.with_calendar_name(calendar.name.clone())),
                ),
                Err(err) => {
                    warn!(calendar = %calendar.name, error = %err, "skipping calendar");
                }
            }
        }

        let events = self.events.clone();
        let cursor = self.cursor.clone();
        let report = run_blocking(move || {
            let report = events.import_batch(&batch)?;
            cursor.advance(Utc::now())?;
            Ok(report)
        })
        .await?;
        Ok(report.summary)
    }

    /// Work events waiting for conversion.
    pub fn pending(&self) -> EngineResult<Vec<ExternalEvent>> {
        self.events.pending_work()
    }

    /// Prefilled draft for a pending event.
    pub fn suggest_draft(&self, id: ExternalEventId) -> EngineResult<ConversionDraft> {
        let event = self.db.read(|conn| pending_in(conn, id))?;
        Ok(ConversionDraft::suggest(&event))
    }

    /// Turns a pending event into an appointment on the slot of its date
    /// and start time, and marks the event converted, in one transaction.
    pub fn convert_one(
        &self,
        id: ExternalEventId,
        draft: ConversionDraft,
    ) -> EngineResult<Appointment> {
        self.db.write(|tx| {
            let event = pending_in(tx, id)?;
            let new = NewAppointment {
                slot_id: slot_id_for(event.date, event.start_time),
                date: event.date,
                time: event.start_time,
                client_name: draft.client_name,
                client_id: draft.client_id,
                service: draft.service,
                notes: draft.notes,
            };
            let appointment = ledger::create_in(tx, &new, self.policy)?;
            external::mark_converted_in(tx, id, appointment.id)?;
            Ok(appointment)
        })
    }

    /// Marks an event converted into an appointment created separately.
    pub fn link(
        &self,
        id: ExternalEventId,
        appointment_id: AppointmentId,
    ) -> EngineResult<ExternalEvent> {
        self.events.mark_converted(id, appointment_id)
    }

    /// Drops a pending event. It comes back on the next import.
    pub fn skip(&self, id: ExternalEventId) -> EngineResult<()> {
        self.events.discard(id)
    }
}

/// Loads an event that can still be converted.
fn pending_in(conn: &rusqlite::Connection, id: ExternalEventId) -> EngineResult<ExternalEvent> {
    let event = external::get_in(conn, id)?;
    if !event.is_pending_work() {
        return Err(EngineError::not_found("pending event", id));
    }
    Ok(event)
}
