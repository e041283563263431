//! Service catalog endpoints

use axum::{Json, Router, extract::State, routing::get};

use slotbook_core::Service;

use crate::routes::{AppError, blocking};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/services", get(list_active))
}

/// GET /services - Active services by category and name
#[tracing::instrument(skip(state))]
async fn list_active(State(state): State<AppState>) -> Result<Json<Vec<Service>>, AppError> {
    let services = blocking(move || state.catalog.list_active()).await?;
    Ok(Json(services))
}
