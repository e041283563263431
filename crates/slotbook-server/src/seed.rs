//! Demo data for an empty database: the salon's catalog, a week of slots
//! and three sample appointments.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rusqlite::{Connection, params};
use tracing::info;

use slotbook_core::{AppointmentStatus, ClockTime, ServiceId, slot_id_for};

use crate::catalog::{self, NewService};
use crate::db::Database;
use crate::error::EngineResult;
use crate::slots::{self, BookingPolicy};

/// name, category, price, minutes, description
const SERVICES: &[(&str, &str, i64, u32, &str)] = &[
    ("Corte de Pelo Mujer", "Peluquería", 25, 45, "Corte personalizado con lavado y secado incluido"),
    ("Corte de Pelo Hombre", "Peluquería", 15, 30, "Corte de caballero con acabado profesional"),
    ("Tinte Completo", "Peluquería", 45, 90, "Coloración completa con productos de calidad"),
    ("Mechas", "Peluquería", 55, 120, "Mechas personalizadas con técnicas modernas"),
    ("Tratamiento Keratina", "Peluquería", 80, 120, "Alisado brasileño con keratina"),
    ("Peinado Especial", "Peluquería", 35, 60, "Peinado para eventos y ocasiones especiales"),
    ("Lavado y Secado", "Peluquería", 15, 30, "Lavado profesional con secado incluido"),
    ("Manicura", "Uñas", 20, 45, "Manicura completa con esmaltado tradicional"),
    ("Uñas Semipermanentes", "Uñas", 28, 60, "Esmaltado semipermanente que dura hasta 3 semanas"),
    ("Uñas Acrílicas", "Uñas", 40, 90, "Extensión de uñas con acrílico y diseño personalizado"),
    ("Nail Art", "Uñas", 35, 75, "Diseños artísticos personalizados en tus uñas"),
    ("Tratamiento Facial Básico", "Estética", 40, 60, "Limpieza facial profunda con hidratación"),
    ("Tratamiento Facial Premium", "Estética", 65, 90, "Tratamiento completo con mascarilla y masaje facial"),
    ("Depilación Cejas", "Estética", 8, 15, "Diseño y depilación de cejas"),
    ("Depilación Completa", "Estética", 50, 60, "Depilación de piernas completas, axilas y zona bikini"),
    ("Maquillaje Profesional", "Estética", 45, 60, "Maquillaje profesional para eventos especiales"),
];

const DAYS: &[u32] = &[22, 23, 24, 26, 27, 29, 30];
const HOURS: &[u32] = &[9, 10, 11, 12, 13, 16, 17, 18, 19];

struct SampleAppointment {
    day: u32,
    hour: u32,
    client: &'static str,
    /// Position in `SERVICES`.
    service: usize,
    notes: &'static str,
    created: (u32, u32, u32),
    /// Completion day and hour, with the service's price as total.
    completed: Option<(u32, u32)>,
}

const APPOINTMENTS: &[SampleAppointment] = &[
    SampleAppointment {
        day: 23,
        hour: 10,
        client: "María García López",
        service: 2,
        notes: "Prefiero tonos castaños claros",
        created: (20, 9, 30),
        completed: None,
    },
    SampleAppointment {
        day: 24,
        hour: 11,
        client: "Laura Martínez Ruiz",
        service: 7,
        notes: "Me gustaría un diseño navideño",
        created: (19, 14, 20),
        completed: None,
    },
    SampleAppointment {
        day: 22,
        hour: 16,
        client: "Carmen Fernández Silva",
        service: 11,
        notes: "",
        created: (20, 11, 45),
        completed: Some((21, 17)),
    },
];

fn december(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, day).unwrap_or_default()
}

fn december_at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

/// Loads the demo data unless the catalog already has services.
/// Returns true if anything was written.
pub fn seed_demo(db: &Database) -> EngineResult<bool> {
    db.write(|tx| {
        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM services", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(false);
        }

        let mut service_ids = Vec::with_capacity(SERVICES.len());
        for &(name, category, price, duration_minutes, description) in SERVICES {
            let service = NewService {
                name: name.to_string(),
                category: category.to_string(),
                price: Decimal::from(price),
                duration_minutes,
                description: Some(description.to_string()),
            };
            service_ids.push(catalog::insert_in(tx, &service)?);
        }

        let mut slot_count = 0;
        for &day in DAYS {
            for &hour in HOURS {
                let time = ClockTime::new(hour, 0).unwrap_or_else(ClockTime::start_of_day);
                slots::open_in(tx, &slot_id_for(december(day), time), december(day), time)?;
                slot_count += 1;
            }
        }

        for sample in APPOINTMENTS {
            insert_sample(tx, sample, service_ids[sample.service])?;
        }

        info!(
            services = service_ids.len(),
            slots = slot_count,
            appointments = APPOINTMENTS.len(),
            "seeded demo data"
        );
        Ok(true)
    })
}

fn insert_sample(conn: &Connection, sample: &SampleAppointment, service_id: ServiceId) -> EngineResult<()> {
    let date = december(sample.day);
    let time = ClockTime::new(sample.hour, 0).unwrap_or_else(ClockTime::start_of_day);
    let slot_id = slot_id_for(date, time);
    slots::book_in(conn, &slot_id, BookingPolicy::Exclusive)?;

    let (day, hour, minute) = sample.created;
    let (status, total, completed_at) = match sample.completed {
        Some((day, hour)) => {
            let price: String =
                conn.query_row("SELECT price FROM services WHERE id = ?1", [service_id], |row| {
                    row.get(0)
                })?;
            (AppointmentStatus::Completed, price, Some(december_at(day, hour, 0)))
        }
        None => (AppointmentStatus::Confirmed, Decimal::ZERO.to_string(), None),
    };

    conn.execute(
        "INSERT INTO appointments
            (slot_id, date, time, client_name, service_id, notes, status, total_paid,
             created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            slot_id,
            date,
            time.to_string(),
            sample.client,
            service_id,
            sample.notes,
            status.as_str(),
            total,
            december_at(day, hour, minute),
            completed_at,
        ],
    )?;
    if completed_at.is_some() {
        conn.execute(
            "INSERT INTO appointment_services (appointment_id, service_id) VALUES (?1, ?2)",
            params![conn.last_insert_rowid(), service_id],
        )?;
    }
    Ok(())
}
