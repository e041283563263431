//! Server configuration.
//!
//! All settings live in `~/.config/slotbook/config.toml` by default. Every
//! section is optional:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3001"
//! allowed_origins = ["http://localhost:5173"]
//!
//! [database]
//! path = "/var/lib/slotbook/slotbook.db"
//! seed_demo = true
//!
//! [booking]
//! allow_double_booking = false
//!
//! [google]
//! access_token = "env::SLOTBOOK_GOOGLE_TOKEN"
//! timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! `access_token` supports the `env::` and `pass::` references of
//! [`crate::secret`].

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use slotbook_core::{TracingConfig, TracingOutputFormat};
use slotbook_providers::Credential;

use crate::secret::{self, SecretError};
use crate::slots::BookingPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to resolve secret: {0}")]
    Secret(#[from] SecretError),

    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub booking: BookingSettings,
    pub google: GoogleSettings,
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Defaults to `slotbook.db` in the user data directory.
    pub path: Option<PathBuf>,
    /// Load the demo catalog, slots and appointments into an empty database.
    pub seed_demo: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    /// Let a new appointment take a slot that is already booked.
    pub allow_double_booking: bool,
}

impl BookingSettings {
    pub fn policy(&self) -> BookingPolicy {
        if self.allow_double_booking {
            BookingPolicy::AllowDoubleBooking
        } else {
            BookingPolicy::Exclusive
        }
    }
}

/// Google Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Fallback access token for sync requests that carry none.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            timeout_secs: 30,
        }
    }
}

impl GoogleSettings {
    /// Resolves the configured token, if any.
    pub fn credential(&self) -> Result<Option<Credential>, ConfigError> {
        let Some(raw) = self.access_token.as_deref() else {
            return Ok(None);
        };
        let token = secret::resolve(raw)?;
        let credential = Credential::new(token.trim());
        Ok((!credential.is_empty()).then_some(credential))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: TracingOutputFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: TracingOutputFormat::Pretty,
        }
    }
}

impl LoggingSettings {
    pub fn tracing_config(&self) -> Result<TracingConfig, ConfigError> {
        let level: Level = self.level.parse().map_err(|_| ConfigError::Invalid {
            key: "logging.level",
            message: format!("unknown level {:?}", self.level),
        })?;
        Ok(TracingConfig::default()
            .with_level(level)
            .with_format(self.format))
    }
}

impl ServerConfig {
    /// Loads the default file, or defaults when it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotbook")
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotbook")
    }

    /// The configured database file or the default location.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("slotbook.db"))
    }
}
