//! Engine error types.

use std::io;

use thiserror::Error;

use slotbook_core::PaymentError;
use slotbook_providers::ProviderError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the stores and the conversion workflow.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or invalid input. Raised before anything is written.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Unknown slot, appointment, service or event.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The operation does not apply to the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The calendar credential is missing or was rejected.
    #[error("calendar authorization required: {0}")]
    UpstreamAuth(String),

    /// The calendar provider failed.
    #[error("calendar provider error: {0}")]
    Upstream(#[source] ProviderError),

    /// SQLite error. The enclosing transaction is rolled back.
    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// A schema migration could not be applied.
    #[error("migration {version} ({name}) failed: {source}")]
    Migration {
        version: u32,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns true if the caller should renew the calendar credential.
    pub fn needs_auth(&self) -> bool {
        matches!(self, Self::UpstreamAuth(_))
    }
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        if err.is_auth() {
            Self::UpstreamAuth(err.message().to_string())
        } else {
            Self::Upstream(err)
        }
    }
}

impl From<PaymentError> for EngineError {
    fn from(err: PaymentError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use slotbook_providers::ProviderErrorCode;

    #[test]
    fn provider_auth_errors_need_auth() {
        let err = EngineError::from(ProviderError::authentication("token expired"));
        assert!(err.needs_auth());
        assert_eq!(
            err.to_string(),
            "calendar authorization required: token expired"
        );

        let err = EngineError::from(ProviderError::new(ProviderErrorCode::ServerError, "boom"));
        assert!(!err.needs_auth());
        assert!(matches!(err, EngineError::Upstream(_)));
    }

    #[test]
    fn payment_errors_are_validation() {
        let err = EngineError::from(PaymentError::InsufficientCash {
            received: Decimal::from(30),
            total: Decimal::from(40),
        });
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("less than the total"));
    }

    #[test]
    fn not_found_message() {
        assert_eq!(
            EngineError::not_found("appointment", 3).to_string(),
            "appointment 3 not found"
        );
    }
}
