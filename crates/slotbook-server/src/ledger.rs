//! Appointment lifecycle.
//!
//! An appointment is created `confirmed` against a slot and either completed,
//! which captures the payment and freezes the total, or deleted. Completion
//! is terminal.
//!
//! Every write runs in one transaction together with the slot change it
//! implies, so a failed insert never leaves a slot booked and a deleted
//! appointment never leaves its slot taken.

use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;
use rusqlite::{Connection, OptionalExtension, Params, Row, params};
use tracing::info;

use slotbook_core::{
    Appointment, AppointmentId, AppointmentStatus, ClientId, NewAppointment, Payment, ServiceId,
    ServiceRef,
};

use crate::catalog;
use crate::db::{Database, parse_column, parse_optional_column};
use crate::error::{EngineError, EngineResult};
use crate::slots::{self, BookingPolicy};

#[derive(Debug, Clone)]
pub struct AppointmentLedger {
    db: Database,
}

impl AppointmentLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All appointments, most recent date first.
    pub fn list(&self) -> EngineResult<Vec<Appointment>> {
        self.db
            .read(|conn| query_in(conn, "ORDER BY date DESC, time DESC, id DESC", []))
    }

    pub fn get(&self, id: AppointmentId) -> EngineResult<Appointment> {
        self.db.read(|conn| get_in(conn, id))
    }

    /// Books the slot and records a confirmed appointment.
    ///
    /// The slot is created from the appointment's date and time if it does
    /// not exist yet.
    pub fn create(&self, new: &NewAppointment, policy: BookingPolicy) -> EngineResult<Appointment> {
        validate(new)?;
        self.db.write(|tx| create_in(tx, new, policy))
    }

    /// Completes an appointment.
    ///
    /// The total is the sum of the current catalog prices of
    /// `services_performed`. Cash must cover it; the change is recorded.
    /// `client_id` replaces the stored client reference only when given.
    pub fn complete(
        &self,
        id: AppointmentId,
        services_performed: &BTreeSet<ServiceId>,
        payment: &Payment,
        client_id: Option<ClientId>,
    ) -> EngineResult<Appointment> {
        if services_performed.is_empty() {
            return Err(EngineError::validation(
                "at least one performed service is required",
            ));
        }

        self.db.write(|tx| {
            let current = get_in(tx, id)?;
            if current.is_completed() {
                return Err(EngineError::conflict(format!(
                    "appointment {id} is already completed"
                )));
            }
            let total = catalog::total_price_in(tx, services_performed)?;
            let settlement = payment.settle(total)?;
            if let Some(client_id) = client_id {
                ensure_client_in(tx, client_id)?;
            }

            tx.execute(
                "UPDATE appointments
                 SET status = ?1, total_paid = ?2, payment_method = ?3, cash_received = ?4,
                     change_returned = ?5, completed_at = ?6, client_id = COALESCE(?7, client_id)
                 WHERE id = ?8",
                params![
                    AppointmentStatus::Completed.as_str(),
                    total.to_string(),
                    settlement.method.as_str(),
                    settlement.cash_received.map(|d| d.to_string()),
                    settlement.change_returned.map(|d| d.to_string()),
                    Utc::now(),
                    client_id,
                    id,
                ],
            )?;

            let mut insert = tx.prepare_cached(
                "INSERT INTO appointment_services (appointment_id, service_id) VALUES (?1, ?2)",
            )?;
            for service_id in services_performed {
                insert.execute(params![id, service_id])?;
            }

            info!(
                appointment_id = id,
                total = %total,
                method = %settlement.method,
                services = services_performed.len(),
                "appointment completed"
            );
            get_in(tx, id)
        })
    }

    /// Deletes an appointment whatever its status, freeing its slot unless
    /// another appointment still holds it.
    pub fn delete(&self, id: AppointmentId) -> EngineResult<()> {
        self.db.write(|tx| {
            let slot_id: String = tx
                .query_row(
                    "SELECT slot_id FROM appointments WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| EngineError::not_found("appointment", id))?;

            tx.execute("DELETE FROM appointments WHERE id = ?1", [id])?;

            let holders: i64 = tx.query_row(
                "SELECT COUNT(*) FROM appointments WHERE slot_id = ?1",
                [&slot_id],
                |row| row.get(0),
            )?;
            if holders == 0 {
                slots::release_in(tx, &slot_id)?;
            }

            info!(
                appointment_id = id,
                slot_id = %slot_id,
                released = (holders == 0),
                "appointment deleted"
            );
            Ok(())
        })
    }
}

/// Checks the required fields and returns the service reference.
fn validate(new: &NewAppointment) -> EngineResult<&ServiceRef> {
    if new.client_name.trim().is_empty() {
        return Err(EngineError::validation("client name is required"));
    }
    if new.slot_id.trim().is_empty() {
        return Err(EngineError::validation("slot id is required"));
    }
    match &new.service {
        None => Err(EngineError::validation("a service is required")),
        Some(ServiceRef::FreeText { label }) if label.trim().is_empty() => {
            Err(EngineError::validation("a service is required"))
        }
        Some(service) => Ok(service),
    }
}

fn ensure_client_in(conn: &Connection, client_id: ClientId) -> EngineResult<()> {
    let known = conn
        .query_row("SELECT 1 FROM clients WHERE id = ?1", [client_id], |_| Ok(()))
        .optional()?
        .is_some();
    if known {
        Ok(())
    } else {
        Err(EngineError::validation(format!("unknown client {client_id}")))
    }
}

/// Creates an appointment inside the caller's transaction.
pub(crate) fn create_in(
    conn: &Connection,
    new: &NewAppointment,
    policy: BookingPolicy,
) -> EngineResult<Appointment> {
    let service = validate(new)?;
    if let Some(client_id) = new.client_id {
        ensure_client_in(conn, client_id)?;
    }
    if let Some(service_id) = service.catalog_id() {
        catalog::total_price_in(conn, &BTreeSet::from([service_id]))?;
    }

    slots::open_in(conn, &new.slot_id, new.date, new.time)?;
    slots::book_in(conn, &new.slot_id, policy)?;

    conn.execute(
        "INSERT INTO appointments
            (slot_id, date, time, client_name, client_id, service_id, service, notes,
             status, total_paid, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            new.slot_id,
            new.date,
            new.time.to_string(),
            new.client_name.trim(),
            new.client_id,
            service.catalog_id(),
            service.label(),
            new.notes,
            AppointmentStatus::Confirmed.as_str(),
            Decimal::ZERO.to_string(),
            Utc::now(),
        ],
    )?;
    let id = conn.last_insert_rowid();

    info!(appointment_id = id, slot_id = %new.slot_id, "appointment created");
    get_in(conn, id)
}

pub(crate) fn get_in(conn: &Connection, id: AppointmentId) -> EngineResult<Appointment> {
    query_in(conn, "WHERE id = ?1", [id])?
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::not_found("appointment", id))
}

const SELECT_APPOINTMENT: &str = "SELECT id, slot_id, date, time, client_name, client_id, \
     service_id, service, notes, status, total_paid, payment_method, cash_received, \
     change_returned, created_at, completed_at FROM appointments";

/// Runs `SELECT ... FROM appointments <clause>` and loads the performed
/// services of each row.
pub(crate) fn query_in<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> EngineResult<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!("{SELECT_APPOINTMENT} {clause}"))?;
    let mut appointments = stmt
        .query_map(params, map_appointment)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut services = conn.prepare_cached(
        "SELECT service_id FROM appointment_services WHERE appointment_id = ?1",
    )?;
    for appointment in &mut appointments {
        appointment.services_performed = services
            .query_map([appointment.id], |row| row.get(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
    }
    Ok(appointments)
}

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let service_id: Option<ServiceId> = row.get(6)?;
    let label: Option<String> = row.get(7)?;
    let service = ServiceRef::from_parts(service_id, label.as_deref()).unwrap_or_else(|| {
        ServiceRef::FreeText {
            label: String::new(),
        }
    });

    Ok(Appointment {
        id: row.get(0)?,
        slot_id: row.get(1)?,
        date: row.get(2)?,
        time: parse_column(row, 3)?,
        client_name: row.get(4)?,
        client_id: row.get(5)?,
        service,
        notes: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        status: parse_column(row, 9)?,
        total_paid: parse_column(row, 10)?,
        payment_method: parse_optional_column(row, 11)?,
        cash_received: parse_optional_column(row, 12)?,
        change_returned: parse_optional_column(row, 13)?,
        created_at: row.get(14)?,
        completed_at: row.get(15)?,
        services_performed: BTreeSet::new(),
    })
}
