//! Read-only billing over completed appointments.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use slotbook_core::{Appointment, AppointmentStatus, BillingMonth, BillingStats};

use crate::db::Database;
use crate::error::EngineResult;
use crate::ledger;

#[derive(Debug, Clone)]
pub struct BillingAggregator {
    db: Database,
}

impl BillingAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Completed appointments, latest completion first, optionally limited
    /// to one month.
    pub fn completed_appointments(
        &self,
        month: Option<BillingMonth>,
    ) -> EngineResult<Vec<Appointment>> {
        let appointments = self.db.read(|conn| {
            ledger::query_in(
                conn,
                "WHERE status = ?1 ORDER BY completed_at DESC, id DESC",
                [AppointmentStatus::Completed.as_str()],
            )
        })?;

        Ok(match month {
            None => appointments,
            Some(month) => appointments
                .into_iter()
                .filter(|a| a.completed_at.is_some_and(|at| month.contains(at)))
                .collect(),
        })
    }

    pub fn stats(&self, month: Option<BillingMonth>) -> EngineResult<BillingStats> {
        let completed = self.completed_appointments(month)?;
        Ok(BillingStats::from_totals(
            completed.iter().map(|a| a.total_paid),
        ))
    }

    /// Months with at least one completion, newest first.
    pub fn months(&self) -> EngineResult<Vec<BillingMonth>> {
        let completions: Vec<DateTime<Utc>> = self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT completed_at FROM appointments
                 WHERE status = ?1 AND completed_at IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([AppointmentStatus::Completed.as_str()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let months: BTreeSet<BillingMonth> = completions.into_iter().map(BillingMonth::of).collect();
        Ok(months.into_iter().rev().collect())
    }
}
