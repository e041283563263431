//! Appointment endpoints

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
    routing::{get, patch},
};

use slotbook_core::AppointmentId;
use slotbook_protocol::{
    Appointment, AppointmentEnvelope, CompleteAppointmentRequest, CreateAppointmentRequest,
    MessageResponse,
};

use crate::routes::{AppError, blocking};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list).post(create))
        .route("/appointments/{id}", get(show).delete(remove))
        .route("/appointments/{id}/complete", patch(complete))
}

/// GET /appointments - Newest first
#[tracing::instrument(skip(state))]
async fn list(State(state): State<AppState>) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = blocking(move || state.appointments.list()).await?;
    Ok(Json(appointments))
}

/// GET /appointments/{id}
#[tracing::instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    id: Result<Path<AppointmentId>, PathRejection>,
) -> Result<Json<Appointment>, AppError> {
    let Path(id) = id?;
    let appointment = blocking(move || state.appointments.get(id)).await?;
    Ok(Json(appointment))
}

/// POST /appointments - Books the slot and records a confirmed appointment
#[tracing::instrument(skip(state, body))]
async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentEnvelope>), AppError> {
    let Json(request) = body?;
    let new = request.into_new_appointment();
    let policy = state.booking_policy;
    let appointment = blocking(move || state.appointments.create(&new, policy)).await?;
    Ok((
        StatusCode::CREATED,
        Json(AppointmentEnvelope::new("appointment created", appointment)),
    ))
}

/// PATCH /appointments/{id}/complete - Records services performed and payment
#[tracing::instrument(skip(state, body))]
async fn complete(
    State(state): State<AppState>,
    id: Result<Path<AppointmentId>, PathRejection>,
    body: Result<Json<CompleteAppointmentRequest>, JsonRejection>,
) -> Result<Json<AppointmentEnvelope>, AppError> {
    let Path(id) = id?;
    let Json(request) = body?;
    let services = request.services();
    let payment = request.payment();
    let client_id = request.client_id;
    let appointment = blocking(move || {
        state
            .appointments
            .complete(id, &services, &payment, client_id)
    })
    .await?;
    Ok(Json(AppointmentEnvelope::new(
        "appointment completed",
        appointment,
    )))
}

/// DELETE /appointments/{id} - Removes the appointment and frees its slot
#[tracing::instrument(skip(state))]
async fn remove(
    State(state): State<AppState>,
    id: Result<Path<AppointmentId>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    blocking(move || state.appointments.delete(id)).await?;
    Ok(Json(MessageResponse::new("appointment deleted")))
}
