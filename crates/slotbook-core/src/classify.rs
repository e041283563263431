//! Classification of imported events by source calendar.
//!
//! An imported event is classified from the display name of the calendar it
//! came from, never from the event content. The mapping is a keyword table
//! checked in order; the first rule with a matching keyword wins and names
//! that match nothing are [`Classification::Home`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of an imported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Bookings for the business; these feed the conversion queue.
    Work,
    /// Personal events.
    Home,
    /// Medical appointments of the owner.
    Medical,
}

impl Classification {
    /// Returns the stored/wire name of this classification.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Home => "home",
            Self::Medical => "medical",
        }
    }

    /// Returns true for events that can be converted into appointments.
    pub fn is_work(&self) -> bool {
        matches!(self, Self::Work)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Self::Work),
            "home" => Ok(Self::Home),
            "medical" => Ok(Self::Medical),
            other => Err(format!("unknown classification: {other}")),
        }
    }
}

/// Keyword rules, checked top to bottom. Keywords are lowercase.
const RULES: &[(Classification, &[&str])] = &[
    (
        Classification::Work,
        &["trabajo", "work", "peluquería", "peluqueria"],
    ),
    (
        Classification::Medical,
        &["médico", "medico", "health", "salud", "doctor"],
    ),
];

/// Classifies a calendar by its display name.
///
/// Matching is a case-insensitive substring search. A missing or empty name
/// classifies as [`Classification::Home`].
pub fn classify(calendar_name: Option<&str>) -> Classification {
    let Some(name) = calendar_name else {
        return Classification::Home;
    };
    let name = name.to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(class, _)| *class)
        .unwrap_or(Classification::Home)
}
