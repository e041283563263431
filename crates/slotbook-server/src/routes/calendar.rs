//! Calendar sync and imported-event endpoints

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};

use slotbook_core::ExternalEventId;
use slotbook_protocol::{
    AppointmentEnvelope, ConversionDraft, ConvertRequest, ExternalEvent, MessageResponse,
    SyncResponse,
};
use slotbook_providers::Credential;

use crate::routes::{AppError, blocking};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/sync", post(sync))
        .route("/calendar/work-events", get(work_events))
        .route("/calendar/events", get(all_events))
        .route("/calendar/events/{id}", delete(discard))
        .route("/calendar/events/{id}/draft", get(draft))
        .route("/calendar/events/{id}/convert", patch(convert))
}

fn bearer(headers: &HeaderMap) -> Option<Credential> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(Credential::from_bearer)
}

/// POST /calendar/sync - Imports events from every calendar
#[tracing::instrument(skip_all)]
async fn sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>, AppError> {
    let summary = state.sync(bearer(&headers)).await?;
    Ok(Json(SyncResponse::from(summary)))
}

/// GET /calendar/work-events - Work events not yet converted
#[tracing::instrument(skip(state))]
async fn work_events(State(state): State<AppState>) -> Result<Json<Vec<ExternalEvent>>, AppError> {
    let events = blocking(move || state.workflow.pending()).await?;
    Ok(Json(events))
}

/// GET /calendar/events - Every imported event
#[tracing::instrument(skip(state))]
async fn all_events(State(state): State<AppState>) -> Result<Json<Vec<ExternalEvent>>, AppError> {
    let events = blocking(move || state.events.list()).await?;
    Ok(Json(events))
}

/// GET /calendar/events/{id}/draft - Prefilled conversion draft
#[tracing::instrument(skip(state))]
async fn draft(
    State(state): State<AppState>,
    id: Result<Path<ExternalEventId>, PathRejection>,
) -> Result<Json<ConversionDraft>, AppError> {
    let Path(id) = id?;
    let draft = blocking(move || state.workflow.suggest_draft(id)).await?;
    Ok(Json(draft))
}

/// PATCH /calendar/events/{id}/convert
///
/// `{appointmentId}` links the event to an existing appointment; a draft
/// creates the appointment from the event.
#[tracing::instrument(skip(state, body))]
async fn convert(
    State(state): State<AppState>,
    id: Result<Path<ExternalEventId>, PathRejection>,
    body: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(request) = body?;
    let response = match request {
        ConvertRequest::Link { appointment_id } => {
            blocking(move || state.workflow.link(id, appointment_id)).await?;
            Json(MessageResponse::new("event marked as converted")).into_response()
        }
        ConvertRequest::Draft(body) => {
            let draft = ConversionDraft::from(body);
            let appointment = blocking(move || state.workflow.convert_one(id, draft)).await?;
            (
                StatusCode::CREATED,
                Json(AppointmentEnvelope::new("event converted", appointment)),
            )
                .into_response()
        }
    };
    Ok(response)
}

/// DELETE /calendar/events/{id} - Discards an event without converting it
#[tracing::instrument(skip(state))]
async fn discard(
    State(state): State<AppState>,
    id: Result<Path<ExternalEventId>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    blocking(move || state.workflow.skip(id)).await?;
    Ok(Json(MessageResponse::new("event discarded")))
}
