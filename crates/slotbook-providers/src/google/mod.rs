//! Google Calendar provider.
//!
//! Reads the calendar list and the events of each calendar through the
//! Calendar API v3 with a bearer token. Token acquisition and refresh are
//! handled elsewhere; the provider is built from a [`Credential`].
//!
//! ```ignore
//! use slotbook_providers::google::{GoogleProvider, DEFAULT_TIMEOUT};
//!
//! let provider = GoogleProvider::new(&credential, DEFAULT_TIMEOUT)?;
//! let calendars = provider.list_calendars().await?;
//! ```
//!
//! [`Credential`]: crate::Credential

mod client;
mod provider;

pub use client::{CalendarListEntry, GoogleCalendarClient};
pub use provider::{DEFAULT_TIMEOUT, GoogleProvider};
