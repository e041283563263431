//! Slot and appointment types.
//!
//! This module provides the bookable [`Slot`], the [`Appointment`] booked
//! against it, and the payment types captured when an appointment is
//! completed. [`Payment::settle`] holds the cash rules so they can be tested
//! without a store.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::ClockTime;

/// Identifier of an appointment.
pub type AppointmentId = i64;
/// Identifier of a catalog service.
pub type ServiceId = i64;
/// Identifier of a directory client.
pub type ClientId = i64;

/// A bookable date/time unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Caller-supplied identifier, usually derived from date and time.
    pub id: String,
    pub date: NaiveDate,
    pub time: ClockTime,
    /// False while an appointment holds the slot.
    pub available: bool,
}

/// The service an appointment was booked for.
///
/// Either a catalog entry or a free-text label typed by whoever booked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceRef {
    /// A service from the catalog.
    Catalog { id: ServiceId },
    /// A free-text description.
    FreeText { label: String },
}

impl ServiceRef {
    /// Builds a reference from the loose `serviceId` / `service` pair used on
    /// the wire. A catalog id takes precedence; blank labels are ignored.
    pub fn from_parts(id: Option<ServiceId>, label: Option<&str>) -> Option<Self> {
        match (id, label.map(str::trim).filter(|l| !l.is_empty())) {
            (Some(id), _) => Some(Self::Catalog { id }),
            (None, Some(label)) => Some(Self::FreeText {
                label: label.to_string(),
            }),
            (None, None) => None,
        }
    }

    /// Returns the catalog id, if this is a catalog reference.
    pub fn catalog_id(&self) -> Option<ServiceId> {
        match self {
            Self::Catalog { id } => Some(*id),
            Self::FreeText { .. } => None,
        }
    }

    /// Returns the free-text label, if this is a free-text reference.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Catalog { .. } => None,
            Self::FreeText { label } => Some(label),
        }
    }
}

/// Lifecycle state of an appointment.
///
/// `Confirmed` is initial and `Completed` is terminal; deleting the
/// appointment is the only way out of `Confirmed` other than completing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Completed,
}

impl AppointmentStatus {
    /// Returns the stored name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

/// How an appointment was paid.
///
/// The wire names are the ones the front desk uses; English aliases are
/// accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "efectivo", alias = "cash")]
    Cash,
    #[serde(rename = "tarjeta", alias = "card")]
    Card,
    #[serde(rename = "bizum")]
    Bizum,
    #[serde(rename = "transferencia", alias = "transfer")]
    Transfer,
}

impl PaymentMethod {
    /// Returns the stored/wire name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "efectivo",
            Self::Card => "tarjeta",
            Self::Bizum => "bizum",
            Self::Transfer => "transferencia",
        }
    }

    /// Returns true for cash, the only method that gives change.
    pub fn is_cash(&self) -> bool {
        matches!(self, Self::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "efectivo" | "cash" => Ok(Self::Cash),
            "tarjeta" | "card" => Ok(Self::Card),
            "bizum" => Ok(Self::Bizum),
            "transferencia" | "transfer" => Ok(Self::Transfer),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Payment details supplied when completing an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: PaymentMethod,
    /// Cash handed over by the client; only meaningful for cash payments.
    pub cash_received: Option<Decimal>,
}

impl Payment {
    /// A cash payment with the amount handed over.
    pub fn cash(received: Decimal) -> Self {
        Self {
            method: PaymentMethod::Cash,
            cash_received: Some(received),
        }
    }

    /// A non-cash payment.
    pub fn with_method(method: PaymentMethod) -> Self {
        Self {
            method,
            cash_received: None,
        }
    }

    /// Applies the payment to a total.
    ///
    /// Cash must cover the total and yields change; other methods never
    /// record cash or change, whatever was supplied.
    pub fn settle(&self, total: Decimal) -> Result<Settlement, PaymentError> {
        if !self.method.is_cash() {
            return Ok(Settlement {
                method: self.method,
                cash_received: None,
                change_returned: None,
            });
        }

        let received = self.cash_received.ok_or(PaymentError::MissingCash)?;
        if received < total {
            return Err(PaymentError::InsufficientCash { received, total });
        }

        Ok(Settlement {
            method: self.method,
            cash_received: Some(received),
            change_returned: Some(received - total),
        })
    }
}

/// Result of settling a payment against a total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub method: PaymentMethod,
    pub cash_received: Option<Decimal>,
    pub change_returned: Option<Decimal>,
}

/// Why a payment could not be settled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("cash payment requires the amount received")]
    MissingCash,

    #[error("cash received ({received}) is less than the total ({total})")]
    InsufficientCash { received: Decimal, total: Decimal },
}

/// A confirmed or completed booking against a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub slot_id: String,
    pub date: NaiveDate,
    pub time: ClockTime,
    pub client_name: String,
    pub client_id: Option<ClientId>,
    pub service: ServiceRef,
    pub notes: String,
    pub status: AppointmentStatus,
    /// Sum of the prices of `services_performed` at completion time.
    pub total_paid: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub cash_received: Option<Decimal>,
    pub change_returned: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Catalog services actually performed; empty until completion.
    pub services_performed: BTreeSet<ServiceId>,
}

impl Appointment {
    /// Returns true once the appointment reached its terminal state.
    pub fn is_completed(&self) -> bool {
        self.status == AppointmentStatus::Completed
    }
}

/// Input for booking a new appointment.
///
/// Nothing is validated here; the ledger rejects blank names, a blank slot id
/// or a missing service before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub slot_id: String,
    pub date: NaiveDate,
    pub time: ClockTime,
    pub client_name: String,
    pub client_id: Option<ClientId>,
    pub service: Option<ServiceRef>,
    #[serde(default)]
    pub notes: String,
}

/// A catalog service. Owned by the catalog; the core only reads prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub duration_minutes: u32,
    pub description: Option<String>,
    pub active: bool,
}

/// A directory client. Owned by the directory; referenced by appointments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}
