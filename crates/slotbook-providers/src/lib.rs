//! CalendarProvider trait and implementations.
//!
//! - [`CalendarProvider`]: lists calendars and fetches their events
//! - [`RawEvent`]: provider-agnostic event data
//! - [`Credential`]: the access token a provider is built from
//! - [`ProviderError`]: error type for provider operations
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Google API     │    │  fixtures       │
//! └────────┬────────┘    └────────┬────────┘
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ GoogleProvider  │    │ MemoryProvider  │
//! └────────┬────────┘    └────────┬────────┘
//!          │   CalendarProvider   │
//!          └──────────┬───────────┘
//!                     ▼
//!              ┌─────────────┐
//!              │  RawEvent   │──▶ import into the event store
//!              └─────────────┘
//! ```

pub mod credential;
pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod provider;
pub mod raw_event;

pub use credential::Credential;
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::MemoryProvider;
pub use provider::{BoxFuture, CalendarInfo, CalendarProvider, DEFAULT_MAX_RESULTS, FetchOptions};
pub use raw_event::{RawEvent, RawEventTime, UNTITLED_SUMMARY};
