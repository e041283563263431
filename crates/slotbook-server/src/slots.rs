//! Slot availability.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, warn};

use slotbook_core::{ClockTime, Slot, slot_id_for};

use crate::db::{Database, parse_column};
use crate::error::{EngineError, EngineResult};

/// What booking does when the slot is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookingPolicy {
    /// Fail with a conflict.
    #[default]
    Exclusive,
    /// Book anyway; the slot ends up shared by several appointments.
    AllowDoubleBooking,
}

/// Reads and toggles slot availability.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    db: Database,
}

impl SlotRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Available slots ordered by date, then time.
    pub fn list_available(&self) -> EngineResult<Vec<Slot>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, time, available FROM slots
                 WHERE available = 1 ORDER BY date, time",
            )?;
            let slots = stmt
                .query_map([], map_slot)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(slots)
        })
    }

    pub fn get(&self, slot_id: &str) -> EngineResult<Slot> {
        self.db.read(|conn| get_in(conn, slot_id))
    }

    /// Marks a slot as taken.
    pub fn book(&self, slot_id: &str, policy: BookingPolicy) -> EngineResult<Slot> {
        self.db.write(|tx| book_in(tx, slot_id, policy))
    }

    /// Marks a slot as free again. Releasing a free slot is a no-op.
    pub fn release(&self, slot_id: &str) -> EngineResult<Slot> {
        self.db.write(|tx| {
            release_in(tx, slot_id)?;
            get_in(tx, slot_id)
        })
    }

    /// Creates the slot for `date` and `time` if it does not exist yet.
    pub fn open(&self, date: NaiveDate, time: ClockTime) -> EngineResult<Slot> {
        let id = slot_id_for(date, time);
        self.db.write(|tx| {
            open_in(tx, &id, date, time)?;
            get_in(tx, &id)
        })
    }

    /// Opens every `time` on every day. Returns how many slots were new.
    pub fn open_schedule(&self, days: &[NaiveDate], times: &[ClockTime]) -> EngineResult<usize> {
        self.db.write(|tx| {
            let mut created = 0;
            for &date in days {
                for &time in times {
                    if open_in(tx, &slot_id_for(date, time), date, time)? {
                        created += 1;
                    }
                }
            }
            debug!(days = days.len(), times = times.len(), created, "opened schedule");
            Ok(created)
        })
    }
}

fn map_slot(row: &Row<'_>) -> rusqlite::Result<Slot> {
    Ok(Slot {
        id: row.get(0)?,
        date: row.get(1)?,
        time: parse_column(row, 2)?,
        available: row.get(3)?,
    })
}

pub(crate) fn get_in(conn: &Connection, slot_id: &str) -> EngineResult<Slot> {
    conn.query_row(
        "SELECT id, date, time, available FROM slots WHERE id = ?1",
        [slot_id],
        map_slot,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("slot", slot_id))
}

/// Inserts the slot unless it exists. Returns true if it was created.
pub(crate) fn open_in(
    conn: &Connection,
    slot_id: &str,
    date: NaiveDate,
    time: ClockTime,
) -> EngineResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO slots (id, date, time, available) VALUES (?1, ?2, ?3, 1)",
        params![slot_id, date, time.to_string()],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn book_in(
    conn: &Connection,
    slot_id: &str,
    policy: BookingPolicy,
) -> EngineResult<Slot> {
    let changed = match policy {
        BookingPolicy::Exclusive => conn.execute(
            "UPDATE slots SET available = 0 WHERE id = ?1 AND available = 1",
            [slot_id],
        )?,
        BookingPolicy::AllowDoubleBooking => {
            conn.execute("UPDATE slots SET available = 0 WHERE id = ?1", [slot_id])?
        }
    };

    let slot = get_in(conn, slot_id)?;
    if changed == 0 && policy == BookingPolicy::Exclusive {
        warn!(slot_id, "slot already booked");
        return Err(EngineError::conflict(format!("slot {slot_id} is already booked")));
    }
    Ok(slot)
}

pub(crate) fn release_in(conn: &Connection, slot_id: &str) -> EngineResult<()> {
    let changed = conn.execute("UPDATE slots SET available = 1 WHERE id = ?1", [slot_id])?;
    if changed == 0 {
        return Err(EngineError::not_found("slot", slot_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::temp_database;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }

    fn time(hour: u32) -> ClockTime {
        ClockTime::new(hour, 0).unwrap()
    }

    #[test]
    fn open_is_idempotent() {
        let (_dir, db) = temp_database();
        let slots = SlotRegistry::new(db);

        let slot = slots.open(date(23), time(10)).unwrap();
        assert_eq!(slot.id, "2025-12-23-10:00");
        assert!(slot.available);

        slots.book(&slot.id, BookingPolicy::Exclusive).unwrap();
        let again = slots.open(date(23), time(10)).unwrap();
        assert!(!again.available);
    }

    #[test]
    fn lists_available_in_order() {
        let (_dir, db) = temp_database();
        let slots = SlotRegistry::new(db);
        let created = slots
            .open_schedule(&[date(24), date(22)], &[time(16), time(9)])
            .unwrap();
        assert_eq!(created, 4);
        assert_eq!(slots.open_schedule(&[date(22)], &[time(9)]).unwrap(), 0);

        slots
            .book("2025-12-22-16:00", BookingPolicy::Exclusive)
            .unwrap();
        let ids: Vec<_> = slots
            .list_available()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(
            ids,
            ["2025-12-22-09:00", "2025-12-24-09:00", "2025-12-24-16:00"]
        );
    }

    #[test]
    fn book_then_release() {
        let (_dir, db) = temp_database();
        let slots = SlotRegistry::new(db);
        let slot = slots.open(date(23), time(10)).unwrap();

        let booked = slots.book(&slot.id, BookingPolicy::Exclusive).unwrap();
        assert!(!booked.available);

        let released = slots.release(&slot.id).unwrap();
        assert!(released.available);
        assert!(slots.release(&slot.id).unwrap().available);
    }

    #[test]
    fn exclusive_booking_conflicts() {
        let (_dir, db) = temp_database();
        let slots = SlotRegistry::new(db);
        let slot = slots.open(date(23), time(10)).unwrap();
        slots.book(&slot.id, BookingPolicy::Exclusive).unwrap();

        let err = slots.book(&slot.id, BookingPolicy::Exclusive).unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let slot = slots
            .book(&slot.id, BookingPolicy::AllowDoubleBooking)
            .unwrap();
        assert!(!slot.available);
    }

    #[test]
    fn unknown_slot() {
        let (_dir, db) = temp_database();
        let slots = SlotRegistry::new(db);
        for err in [
            slots.book("nope", BookingPolicy::Exclusive).unwrap_err(),
            slots.book("nope", BookingPolicy::AllowDoubleBooking).unwrap_err(),
            slots.release("nope").unwrap_err(),
            slots.get("nope").unwrap_err(),
        ] {
            assert!(matches!(err, EngineError::NotFound { entity: "slot", .. }));
        }
    }
}
