//! Slot endpoints

use axum::{Json, Router, extract::State, routing::get};

use slotbook_protocol::Slot;

use crate::routes::{AppError, blocking};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/slots", get(list_available))
}

/// GET /slots - Open slots in chronological order
#[tracing::instrument(skip(state))]
async fn list_available(State(state): State<AppState>) -> Result<Json<Vec<Slot>>, AppError> {
    let slots = blocking(move || state.slots.list_available()).await?;
    Ok(Json(slots))
}
