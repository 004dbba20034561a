use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// "Load more" found nothing new. Distinct from NotFound so clients can
    /// show "no more results" instead of an error banner.
    #[error("No more results: {0}")]
    Exhausted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, exhausted, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, false, msg),
            AppError::Exhausted(msg) => (StatusCode::NOT_FOUND, true, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, false, msg),
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, false, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, false, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, false, self.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "exhausted": exhausted,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
