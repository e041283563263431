//! Core types: slots, appointments, imported events, classification, time, tracing

pub mod appointment;
pub mod billing;
pub mod classify;
pub mod external;
pub mod time;
pub mod tracing;

pub use appointment::{
    Appointment, AppointmentId, AppointmentStatus, Client, ClientId, NewAppointment, Payment,
    PaymentError, PaymentMethod, Service, ServiceId, ServiceRef, Settlement, Slot,
};
pub use billing::BillingStats;
pub use classify::{Classification, classify};
pub use external::{ConversionDraft, ExternalEvent, ExternalEventId, SyncSummary};
pub use time::{BillingMonth, ClockTime, TimeParseError, slot_id_for, sync_window_start};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
