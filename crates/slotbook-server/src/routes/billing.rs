//! Billing endpoints

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};

use slotbook_core::BillingMonth;
use slotbook_protocol::{Appointment, BillingQuery, BillingStats};

use crate::routes::{AppError, blocking};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/billing", get(completed))
        .route("/billing/stats", get(stats))
        .route("/billing/months", get(months))
}

/// GET /billing?month=YYYY-MM - Completed appointments, newest first
#[tracing::instrument(skip(state))]
async fn completed(
    State(state): State<AppState>,
    query: Result<Query<BillingQuery>, QueryRejection>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let Query(query) = query?;
    let appointments =
        blocking(move || state.billing.completed_appointments(query.month)).await?;
    Ok(Json(appointments))
}

/// GET /billing/stats?month=YYYY-MM
#[tracing::instrument(skip(state))]
async fn stats(
    State(state): State<AppState>,
    query: Result<Query<BillingQuery>, QueryRejection>,
) -> Result<Json<BillingStats>, AppError> {
    let Query(query) = query?;
    let stats = blocking(move || state.billing.stats(query.month)).await?;
    Ok(Json(stats))
}

/// GET /billing/months - Months with completed appointments, newest first
#[tracing::instrument(skip(state))]
async fn months(State(state): State<AppState>) -> Result<Json<Vec<BillingMonth>>, AppError> {
    let months = blocking(move || state.billing.months()).await?;
    Ok(Json(months))
}
