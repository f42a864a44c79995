use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;

use corkboard_types::api::{CreateMessageRequest, DeleteResponse};
use corkboard_types::models::Message;

use crate::{ApiError, AppState, run_blocking};

/// GET /api/messages — every message, newest first.
pub async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<Message>>, ApiError> {
    let db = state.db.clone();
    let messages = run_blocking(move || Ok(db.list_messages()?)).await?;
    Ok(Json(messages))
}

/// POST /api/messages
pub async fn create_message(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateMessageRequest>, ApiError>,
) -> Result<Json<Message>, ApiError> {
    let db = state.db.clone();
    let message = run_blocking(move || {
        let content = req.content.unwrap_or_default();
        Ok(db.create_message(req.name.as_deref(), &content)?)
    })
    .await?;

    info!("Message {} posted by {}", message.id, message.name);
    Ok(Json(message))
}

/// DELETE /api/messages/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let db = state.db.clone();
    run_blocking(move || Ok(db.delete_message(id)?)).await?;

    info!("Message {} deleted", id);
    Ok(Json(DeleteResponse { success: true }))
}

/// POST /api/messages/{id}/like — returns the message after the increment.
pub async fn like_message(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Message>, ApiError> {
    let db = state.db.clone();
    let message = run_blocking(move || Ok(db.like_message(id)?)).await?;
    Ok(Json(message))
}
