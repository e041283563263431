//! Appointment engine: SQLite store, calendar import and conversion, HTTP API.
//!
//! - [`SlotRegistry`] opens, books and releases slots
//! - [`AppointmentLedger`] creates, completes and deletes appointments
//! - [`BillingAggregator`] reports revenue over completed appointments
//! - [`ExternalEventStore`] keeps imported calendar events
//! - [`ConversionWorkflow`] syncs calendars and turns work events into appointments
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use slotbook_server::{AppState, Database, GoogleProviderFactory, routes};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("slotbook.db")?;
//!     let state = AppState::new(db, Arc::new(GoogleProviderFactory::default()));
//!     let app = routes::router(state, routes::cors_layer(&[]));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

mod billing;
mod catalog;
pub mod config;
mod cursor;
mod db;
mod error;
mod external;
mod ledger;
mod migrations;
pub mod routes;
pub mod secret;
mod seed;
mod slots;
mod state;
mod workflow;

pub use billing::BillingAggregator;
pub use catalog::{Catalog, NewService};
pub use config::{ConfigError, ServerConfig};
pub use cursor::{SyncCursor, SyncCursorStore};
pub use db::Database;
pub use error::{EngineError, EngineResult};
pub use external::{ExternalEventStore, ImportReport};
pub use ledger::AppointmentLedger;
pub use seed::seed_demo;
pub use slots::{BookingPolicy, SlotRegistry};
pub use state::AppState;
#[cfg(feature = "google")]
pub use workflow::GoogleProviderFactory;
pub use workflow::{ConversionWorkflow, FixedProviderFactory, ProviderFactory};
