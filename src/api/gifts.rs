use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::GiftFinderRequest,
    services::sessions::{ExtensionOutcome, SessionOutcome, SessionView},
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Handler for creating a recommendation session
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<GiftFinderRequest>,
) -> AppResult<(StatusCode, Json<SessionOutcome>)> {
    let outcome = state.gifts.create_session(&request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Handler for reading a session back
pub async fn show(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let view = state.gifts.session_view(session_id).await?;
    Ok(Json(view))
}

/// Handler for "load more" on an existing session
pub async fn extend(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ExtensionOutcome>> {
    let outcome = state.gifts.extend_session(session_id).await?;
    Ok(Json(outcome))
}

/// Handler for (re)generating a recommendation's personal message
pub async fn message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let message = state.gifts.regenerate_message(id).await?;
    Ok(Json(MessageResponse { message }))
}
