//! Time types for slots, appointments and imported events.
//!
//! This module provides [`ClockTime`] for the `HH:MM` wall-clock times that
//! slots and appointments are keyed on, [`BillingMonth`] for selecting a
//! calendar month of completed work, and the helpers that derive slot
//! identifiers and the lower bound of a calendar import.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// How far back the first calendar import looks when nothing was synced yet.
pub const INITIAL_SYNC_LOOKBACK_DAYS: i64 = 30;

/// Errors produced when parsing the textual time formats.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// Not a valid `HH:MM` time of day.
    #[error("invalid time of day {0:?}, expected HH:MM")]
    ClockTime(String),

    /// Not a valid `YYYY-MM` month.
    #[error("invalid month {0:?}, expected YYYY-MM")]
    Month(String),
}

/// A wall-clock time of day with minute precision.
///
/// Serialized as `HH:MM`. Parsing also accepts `HH:MM:SS` and drops the seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    /// Creates a clock time from an hour and minute.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Midnight, used as the start of all-day events.
    pub fn start_of_day() -> Self {
        Self(NaiveTime::MIN)
    }

    /// 23:59, used as the end of all-day events.
    pub fn end_of_day() -> Self {
        Self(NaiveTime::from_hms_opt(23, 59, 0).expect("valid time"))
    }

    /// Truncates a `NaiveTime` to minute precision.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).expect("valid time"))
    }

    /// Returns the hour component.
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Returns the minute component.
    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Returns the underlying `NaiveTime`.
    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map(Self::from_naive)
            .map_err(|_| TimeParseError::ClockTime(s.to_string()))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A calendar month used to filter billing data, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    /// Creates a month; `month` is 1-based.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month a UTC timestamp falls in.
    pub fn of(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// Returns true if the timestamp falls inside this month (UTC).
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        Self::of(dt) == *self
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid month")
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingMonth {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeParseError::Month(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year = year.parse().map_err(|_| err())?;
        let month = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl Serialize for BillingMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillingMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Derives the slot identifier for a date and time (`YYYY-MM-DD-HH:MM`).
///
/// Seeded slots and slots opened by a conversion share this format, so a
/// converted event lands on the seeded slot of the same date and time.
pub fn slot_id_for(date: NaiveDate, time: ClockTime) -> String {
    format!("{}-{}", date.format("%Y-%m-%d"), time)
}

/// Lower bound for the next calendar import.
///
/// Resumes from the last sync when there was one, otherwise looks back
/// [`INITIAL_SYNC_LOOKBACK_DAYS`] days from `now`.
pub fn sync_window_start(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    last_sync.unwrap_or_else(|| now - Duration::days(INITIAL_SYNC_LOOKBACK_DAYS))
}
