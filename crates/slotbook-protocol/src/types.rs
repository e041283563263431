//! Request and response bodies.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use slotbook_core::{
    Appointment, AppointmentId, BillingMonth, ClientId, ClockTime, ConversionDraft,
    NewAppointment, Payment, PaymentMethod, ServiceId, ServiceRef, SyncSummary,
};

/// `POST /appointments` body.
///
/// String fields default to empty so a missing value is reported as a
/// validation error rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    #[serde(default)]
    pub slot_id: String,
    pub date: NaiveDate,
    pub time: ClockTime,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    /// Free-text service, used when no `serviceId` is given.
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn into_new_appointment(self) -> NewAppointment {
        let service = ServiceRef::from_parts(self.service_id, self.service.as_deref());
        NewAppointment {
            slot_id: self.slot_id.trim().to_string(),
            date: self.date,
            time: self.time,
            client_name: self.client_name.trim().to_string(),
            client_id: self.client_id,
            service,
            notes: self.notes.unwrap_or_default(),
        }
    }
}

/// `PATCH /appointments/{id}/complete` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAppointmentRequest {
    #[serde(rename = "serviciosRealizados", alias = "servicesPerformed", default)]
    pub services_performed: Vec<ServiceId>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub cash_received: Option<Decimal>,
    /// Change computed by the client. Accepted and ignored; the server
    /// computes change itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

impl CompleteAppointmentRequest {
    pub fn services(&self) -> BTreeSet<ServiceId> {
        self.services_performed.iter().copied().collect()
    }

    pub fn payment(&self) -> Payment {
        Payment {
            method: self.payment_method,
            cash_received: self.cash_received,
        }
    }
}

/// Conversion draft as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftBody {
    pub client_name: String,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<DraftBody> for ConversionDraft {
    fn from(body: DraftBody) -> Self {
        Self {
            service: ServiceRef::from_parts(body.service_id, body.service.as_deref()),
            client_name: body.client_name.trim().to_string(),
            client_id: body.client_id,
            notes: body.notes.unwrap_or_default(),
        }
    }
}

/// `PATCH /calendar/events/{id}/convert` body.
///
/// Either links the event to an appointment created separately, or carries
/// a draft the server turns into the appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConvertRequest {
    #[serde(rename_all = "camelCase")]
    Link { appointment_id: AppointmentId },
    Draft(DraftBody),
}

/// `?month=YYYY-MM` on billing routes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingQuery {
    #[serde(default)]
    pub month: Option<BillingMonth>,
}

/// A message plus the appointment it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentEnvelope {
    pub message: String,
    pub appointment: Appointment,
}

impl AppointmentEnvelope {
    pub fn new(message: impl Into<String>, appointment: Appointment) -> Self {
        Self {
            message: message.into(),
            appointment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `POST /calendar/sync` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: SyncSummary,
}

impl From<SyncSummary> for SyncResponse {
    fn from(summary: SyncSummary) -> Self {
        Self {
            message: "sync completed".to_string(),
            summary,
        }
    }
}

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok(version: impl Into<String>) -> Self {
        Self {
            status: "OK".to_string(),
            version: version.into(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    /// Set when the calendar credential must be renewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_auth: Option<bool>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            needs_auth: None,
        }
    }

    pub fn needs_auth(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            needs_auth: Some(true),
        }
    }
}
