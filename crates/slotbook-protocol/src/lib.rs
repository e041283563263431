//! JSON request/response types for the slotbook HTTP API.
//!
//! Bodies are camelCase JSON. Field names of the completion request keep the
//! names the front desk client already sends (`serviciosRealizados`).
//!
//! ```rust
//! use slotbook_protocol::ErrorBody;
//!
//! let body = ErrorBody::needs_auth("token expired");
//! assert_eq!(
//!     serde_json::to_string(&body).unwrap(),
//!     r#"{"error":"token expired","needsAuth":true}"#
//! );
//! ```

mod types;

pub use types::{
    AppointmentEnvelope, BillingQuery, CompleteAppointmentRequest, ConvertRequest,
    CreateAppointmentRequest, DraftBody, ErrorBody, HealthResponse, MessageResponse, SyncResponse,
};

pub use slotbook_core::{
    Appointment, BillingStats, ConversionDraft, ExternalEvent, Slot, SyncSummary,
};

/// Prefix under which every route is mounted.
pub const API_PREFIX: &str = "/api";
