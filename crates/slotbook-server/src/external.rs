//! Imported calendar events.
//!
//! Events are keyed by the provider's id: importing the same id again
//! overwrites the stored copy rather than adding a row. Events missing from
//! a later import are left alone, and discarding an event deletes its row,
//! so the next import brings it back as pending.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use slotbook_core::{
    AppointmentId, ClockTime, ExternalEvent, ExternalEventId, SyncSummary, classify,
};
use slotbook_providers::RawEvent;

use crate::db::{Database, parse_column};
use crate::error::{EngineError, EngineResult};

/// Outcome of one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    /// Cancelled events, left untouched.
    pub skipped: usize,
    /// Classification counts of the imported events.
    pub summary: SyncSummary,
}

#[derive(Debug, Clone)]
pub struct ExternalEventStore {
    db: Database,
}

impl ExternalEventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Upserts a batch in one transaction.
    ///
    /// Every provider-owned field is overwritten on re-import. The
    /// conversion flag and its appointment reference are local state and
    /// are never touched.
    pub fn import_batch(&self, events: &[RawEvent]) -> EngineResult<ImportReport> {
        self.db.write(|tx| {
            let mut report = ImportReport::default();
            let mut classes = Vec::with_capacity(events.len());

            let mut exists =
                tx.prepare_cached("SELECT 1 FROM external_events WHERE external_id = ?1")?;
            let mut upsert = tx.prepare_cached(
                "INSERT INTO external_events
                    (external_id, calendar_name, summary, description, date, start_time,
                     end_time, location, attendees, classification)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(external_id) DO UPDATE SET
                    calendar_name = excluded.calendar_name,
                    summary = excluded.summary,
                    description = excluded.description,
                    date = excluded.date,
                    start_time = excluded.start_time,
                    end_time = excluded.end_time,
                    location = excluded.location,
                    attendees = excluded.attendees,
                    classification = excluded.classification",
            )?;

            for event in events {
                if event.is_cancelled() {
                    debug!(external_id = %event.id, "skipping cancelled event");
                    report.skipped += 1;
                    continue;
                }

                let classification = classify(event.calendar_name.as_deref());
                let attendees = serde_json::to_string(&event.attendees)
                    .map_err(|e| EngineError::validation(format!("attendees: {e}")))?;
                let known = exists
                    .query_row([&event.id], |_| Ok(()))
                    .optional()?
                    .is_some();

                upsert.execute(params![
                    event.id,
                    event.calendar_name,
                    event.title(),
                    event.description,
                    event.start.wall_date(),
                    event.start.wall_time_or(ClockTime::start_of_day()).to_string(),
                    event.end.wall_time_or(ClockTime::end_of_day()).to_string(),
                    event.location,
                    attendees,
                    classification.as_str(),
                ])?;

                if known {
                    report.updated += 1;
                } else {
                    report.inserted += 1;
                }
                classes.push(classification);
            }

            report.summary = SyncSummary::tally(classes);
            info!(
                inserted = report.inserted,
                updated = report.updated,
                skipped = report.skipped,
                work = report.summary.work_events,
                "imported calendar events"
            );
            Ok(report)
        })
    }

    /// Every stored event by date and start time.
    pub fn list(&self) -> EngineResult<Vec<ExternalEvent>> {
        self.db
            .read(|conn| query_in(conn, "ORDER BY date, start_time, id", []))
    }

    pub fn get(&self, id: ExternalEventId) -> EngineResult<ExternalEvent> {
        self.db.read(|conn| get_in(conn, id))
    }

    /// Work events not converted yet, by date and start time.
    pub fn pending_work(&self) -> EngineResult<Vec<ExternalEvent>> {
        self.db.read(|conn| {
            query_in(
                conn,
                "WHERE classification = 'work' AND converted = 0 ORDER BY date, start_time, id",
                [],
            )
        })
    }

    /// Records that `id` became appointment `appointment_id`.
    pub fn mark_converted(
        &self,
        id: ExternalEventId,
        appointment_id: AppointmentId,
    ) -> EngineResult<ExternalEvent> {
        self.db.write(|tx| {
            mark_converted_in(tx, id, appointment_id)?;
            get_in(tx, id)
        })
    }

    /// Deletes the event. Converted events are kept.
    pub fn discard(&self, id: ExternalEventId) -> EngineResult<()> {
        self.db.write(|tx| {
            let event = get_in(tx, id)?;
            if event.converted {
                return Err(EngineError::conflict(format!(
                    "event {id} was converted and cannot be discarded"
                )));
            }
            tx.execute("DELETE FROM external_events WHERE id = ?1", [id])?;
            info!(event_id = id, external_id = %event.external_id, "discarded event");
            Ok(())
        })
    }
}

pub(crate) fn mark_converted_in(
    conn: &Connection,
    id: ExternalEventId,
    appointment_id: AppointmentId,
) -> EngineResult<()> {
    let event = get_in(conn, id)?;
    if event.converted {
        return Err(EngineError::conflict(format!("event {id} is already converted")));
    }
    let appointment_exists = conn
        .query_row(
            "SELECT 1 FROM appointments WHERE id = ?1",
            [appointment_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !appointment_exists {
        return Err(EngineError::not_found("appointment", appointment_id));
    }

    conn.execute(
        "UPDATE external_events SET converted = 1, converted_appointment_id = ?1 WHERE id = ?2",
        params![appointment_id, id],
    )?;
    info!(event_id = id, appointment_id, "event converted");
    Ok(())
}

pub(crate) fn get_in(conn: &Connection, id: ExternalEventId) -> EngineResult<ExternalEvent> {
    query_in(conn, "WHERE id = ?1", [id])?
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::not_found("event", id))
}

const SELECT_EVENT: &str = "SELECT id, external_id, calendar_name, summary, description, date, \
     start_time, end_time, location, attendees, classification, converted, \
     converted_appointment_id FROM external_events";

fn query_in<P: rusqlite::Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> EngineResult<Vec<ExternalEvent>> {
    let mut stmt = conn.prepare(&format!("{SELECT_EVENT} {clause}"))?;
    let events = stmt
        .query_map(params, map_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<ExternalEvent> {
    let attendees: String = row.get(9)?;
    // Older rows may hold something other than a JSON list.
    let attendees = serde_json::from_str(&attendees).unwrap_or_default();

    Ok(ExternalEvent {
        id: row.get(0)?,
        external_id: row.get(1)?,
        calendar_name: row.get(2)?,
        summary: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
        start_time: parse_column(row, 6)?,
        end_time: parse_column(row, 7)?,
        location: row.get(8)?,
        attendees,
        classification: parse_column(row, 10)?,
        converted: row.get(11)?,
        converted_appointment_id: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use slotbook_core::Classification;
    use slotbook_providers::RawEventTime;

    use crate::db::temp_database;

    fn timed(id: &str, calendar: &str, start: &str, end: &str) -> RawEvent {
        RawEvent::new(
            id,
            RawEventTime::parse(Some(start), None).unwrap(),
            RawEventTime::parse(Some(end), None).unwrap(),
            "cal",
        )
        .with_calendar_name(calendar)
    }

    fn appointment(db: &Database) -> AppointmentId {
        db.write(|tx| {
            tx.execute(
                "INSERT INTO slots (id, date, time) VALUES ('s', '2025-12-23', '10:00')",
                [],
            )?;
            tx.execute(
                "INSERT INTO appointments (slot_id, date, time, client_name, service, created_at)
                 VALUES ('s', '2025-12-23', '10:00', 'Ana', 'Corte', '2025-12-20T10:00:00Z')",
                [],
            )?;
            Ok(tx.last_insert_rowid())
        })
        .unwrap()
    }

    #[test]
    fn import_derives_fields() {
        let (_dir, db) = temp_database();
        let store = ExternalEventStore::new(db);
        let all_day = RawEvent::new(
            "day",
            RawEventTime::parse(None, Some("2025-12-24")).unwrap(),
            RawEventTime::parse(None, Some("2025-12-25")).unwrap(),
            "cal",
        )
        .with_calendar_name("Médico");

        let report = store
            .import_batch(&[
                timed(
                    "cut",
                    "Peluquería",
                    "2025-12-23T10:00:00+01:00",
                    "2025-12-23T11:30:00+01:00",
                )
                .with_summary("Corte - Ana")
                .with_attendee("ana@example.com"),
                all_day,
            ])
            .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.summary.work_events, 1);
        assert_eq!(report.summary.regular_events, 1);

        let events = store.list().unwrap();
        let cut = &events[0];
        assert_eq!(cut.external_id, "cut");
        assert_eq!(cut.date, NaiveDate::from_ymd_opt(2025, 12, 23).unwrap());
        assert_eq!(cut.start_time.to_string(), "10:00");
        assert_eq!(cut.end_time.to_string(), "11:30");
        assert_eq!(cut.classification, Classification::Work);
        assert_eq!(cut.attendees, ["ana@example.com"]);

        let day = &events[1];
        assert_eq!(day.summary, "Sin título");
        assert_eq!(day.start_time.to_string(), "00:00");
        assert_eq!(day.end_time.to_string(), "23:59");
        assert_eq!(day.classification, Classification::Medical);
    }

    #[test]
    fn reimport_overwrites_without_duplicating() {
        let (_dir, db) = temp_database();
        let store = ExternalEventStore::new(db);
        store
            .import_batch(&[timed(
                "e1",
                "Casa",
                "2025-12-23T10:00:00Z",
                "2025-12-23T11:00:00Z",
            )
            .with_summary("Cena")])
            .unwrap();

        let report = store
            .import_batch(&[timed(
                "e1",
                "Trabajo",
                "2025-12-24T16:00:00Z",
                "2025-12-24T17:00:00Z",
            )
            .with_summary("Tinte - Laura")])
            .unwrap();
        assert_eq!((report.inserted, report.updated), (0, 1));

        let events = store.list().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Tinte - Laura");
        assert_eq!(events[0].start_time.to_string(), "16:00");
        assert_eq!(events[0].classification, Classification::Work);
    }

    #[test]
    fn cancelled_events_are_skipped() {
        let (_dir, db) = temp_database();
        let store = ExternalEventStore::new(db);
        let report = store
            .import_batch(&[timed(
                "gone",
                "Trabajo",
                "2025-12-23T10:00:00Z",
                "2025-12-23T11:00:00Z",
            )
            .with_status("cancelled")])
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.summary.total, 0);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn conversion_survives_reimport() {
        let (_dir, db) = temp_database();
        let store = ExternalEventStore::new(db.clone());
        let event = timed("e1", "Trabajo", "2025-12-23T10:00:00Z", "2025-12-23T11:00:00Z");
        store.import_batch(std::slice::from_ref(&event)).unwrap();
        let id = store.pending_work().unwrap()[0].id;

        let appointment_id = appointment(&db);
        let converted = store.mark_converted(id, appointment_id).unwrap();
        assert!(converted.converted);
        assert_eq!(converted.converted_appointment_id, Some(appointment_id));

        store.import_batch(&[event]).unwrap();
        let stored = store.get(id).unwrap();
        assert!(stored.converted);
        assert_eq!(stored.converted_appointment_id, Some(appointment_id));
        assert!(store.pending_work().unwrap().is_empty());
    }

    #[test]
    fn mark_converted_guards() {
        let (_dir, db) = temp_database();
        let store = ExternalEventStore::new(db.clone());
        store
            .import_batch(&[timed(
                "e1",
                "Trabajo",
                "2025-12-23T10:00:00Z",
                "2025-12-23T11:00:00Z",
            )])
            .unwrap();
        let id = store.list().unwrap()[0].id;

        assert!(matches!(
            store.mark_converted(999, 1).unwrap_err(),
            EngineError::NotFound { entity: "event", .. }
        ));
        assert!(matches!(
            store.mark_converted(id, 999).unwrap_err(),
            EngineError::NotFound { entity: "appointment", .. }
        ));

        let appointment_id = appointment(&db);
        store.mark_converted(id, appointment_id).unwrap();
        assert!(matches!(
            store.mark_converted(id, appointment_id).unwrap_err(),
            EngineError::Conflict(_)
        ));
        assert!(matches!(store.discard(id).unwrap_err(), EngineError::Conflict(_)));
    }

    #[test]
    fn pending_work_filters_and_orders() {
        let (_dir, db) = temp_database();
        let store = ExternalEventStore::new(db);
        store
            .import_batch(&[
                timed("late", "Trabajo", "2025-12-24T09:00:00Z", "2025-12-24T10:00:00Z"),
                timed("home", "Casa", "2025-12-22T09:00:00Z", "2025-12-22T10:00:00Z"),
                timed("early", "Work", "2025-12-23T12:00:00Z", "2025-12-23T13:00:00Z"),
            ])
            .unwrap();

        let ids: Vec<_> = store
            .pending_work()
            .unwrap()
            .into_iter()
            .map(|e| e.external_id)
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[test]
    fn discard_unknown_event() {
        let (_dir, db) = temp_database();
        let err = ExternalEventStore::new(db).discard(7).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
