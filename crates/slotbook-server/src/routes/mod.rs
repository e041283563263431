//! HTTP routes, all mounted under `/api`.

pub mod appointments;
pub mod billing;
pub mod calendar;
pub mod health;
pub mod services;
pub mod slots;

use axum::{
    Json, Router,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use slotbook_protocol::{API_PREFIX, ErrorBody};

use crate::db::run_blocking;
use crate::error::{EngineError, EngineResult};
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(slots::router())
        .merge(services::router())
        .merge(appointments::router())
        .merge(billing::router())
        .merge(calendar::router());

    Router::new()
        .nest(API_PREFIX, api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS for the given origins. An empty list allows any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// Error returned by every handler.
#[derive(Debug)]
pub enum AppError {
    Engine(EngineError),
    /// The request could not be decoded.
    BadRequest(String),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn engine_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::UpstreamAuth(_) => StatusCode::UNAUTHORIZED,
        EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
        EngineError::Persistence(_) | EngineError::Migration { .. } | EngineError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Engine(err) => {
                let status = engine_status(&err);
                let body = if err.needs_auth() {
                    ErrorBody::needs_auth(err.to_string())
                } else {
                    ErrorBody::new(err.to_string())
                };
                (status, body)
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorBody::new(message)),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %body.error, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %body.error, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

/// Runs a store call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(run_blocking(f).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotbook_providers::{ProviderError, ProviderErrorCode};

    #[test]
    fn status_mapping() {
        let cases = [
            (EngineError::validation("x"), StatusCode::BAD_REQUEST),
            (EngineError::not_found("slot", "s"), StatusCode::NOT_FOUND),
            (EngineError::conflict("x"), StatusCode::CONFLICT),
            (EngineError::UpstreamAuth("x".into()), StatusCode::UNAUTHORIZED),
            (
                EngineError::from(ProviderError::new(ProviderErrorCode::ServerError, "boom")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EngineError::from(rusqlite::Error::InvalidQuery),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
