//! Read side of the service catalog.
//!
//! The catalog is maintained elsewhere; the engine only reads current prices
//! when an appointment is completed. Inserts and price updates exist for
//! seeding and for tests.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use rusqlite::{Connection, OptionalExtension, Row, params};

use slotbook_core::{Service, ServiceId};

use crate::db::{Database, parse_column};
use crate::error::{EngineError, EngineResult};

/// A service to add to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub duration_minutes: u32,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Active services by category, then name.
    pub fn list_active(&self) -> EngineResult<Vec<Service>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_SERVICE} WHERE active = 1 ORDER BY category, name"
            ))?;
            let services = stmt
                .query_map([], map_service)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(services)
        })
    }

    pub fn get(&self, id: ServiceId) -> EngineResult<Service> {
        self.db.read(|conn| {
            conn.query_row(&format!("{SELECT_SERVICE} WHERE id = ?1"), [id], map_service)
                .optional()?
                .ok_or_else(|| EngineError::not_found("service", id))
        })
    }

    pub fn add(&self, service: &NewService) -> EngineResult<Service> {
        let id = self.db.write(|tx| insert_in(tx, service))?;
        self.get(id)
    }

    /// Changes the current price. Completed appointments keep the total they
    /// were charged.
    pub fn set_price(&self, id: ServiceId, price: Decimal) -> EngineResult<()> {
        let changed = self.db.write(|tx| {
            Ok(tx.execute(
                "UPDATE services SET price = ?1 WHERE id = ?2",
                params![price.to_string(), id],
            )?)
        })?;
        if changed == 0 {
            return Err(EngineError::not_found("service", id));
        }
        Ok(())
    }
}

const SELECT_SERVICE: &str =
    "SELECT id, name, category, price, duration_minutes, description, active FROM services";

fn map_service(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        price: parse_column(row, 3)?,
        duration_minutes: row.get(4)?,
        description: row.get(5)?,
        active: row.get(6)?,
    })
}

pub(crate) fn insert_in(conn: &Connection, service: &NewService) -> EngineResult<ServiceId> {
    conn.execute(
        "INSERT INTO services (name, category, price, duration_minutes, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.name,
            service.category,
            service.price.to_string(),
            service.duration_minutes,
            service.description,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Sums the current prices of `ids`. Unknown ids are a validation error.
pub(crate) fn total_price_in(conn: &Connection, ids: &BTreeSet<ServiceId>) -> EngineResult<Decimal> {
    let mut stmt = conn.prepare_cached("SELECT price FROM services WHERE id = ?1")?;
    let mut total = Decimal::ZERO;
    for &id in ids {
        let price: Option<Decimal> = stmt
            .query_row([id], |row| parse_column(row, 0))
            .optional()?;
        match price {
            Some(price) => total += price,
            None => return Err(EngineError::validation(format!("unknown service {id}"))),
        }
    }
    Ok(total)
}

#[cfg(test)]
pub(crate) fn test_service(name: &str, price: i64) -> NewService {
    NewService {
        name: name.to_string(),
        category: "Peluquería".to_string(),
        price: Decimal::from(price),
        duration_minutes: 30,
        description: None,
    }
}
