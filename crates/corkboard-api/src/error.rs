use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use corkboard_backup::BackupError;
use corkboard_db::StoreError;
use corkboard_types::api::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can return, mapped onto an HTTP status and a
/// `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error("{0} not found")]
    Missing(String),
    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
    /// A path segment that does not parse cannot name an existing resource.
    #[error("not found: {}", .0.body_text())]
    Path(#[from] PathRejection),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build response: {0}")]
    Http(#[from] axum::http::Error),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Backup(BackupError::NotFound(_) | BackupError::InvalidName(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Missing(_) | Self::Path(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
