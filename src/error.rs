use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

/// AppError
///
/// The single error type returned by handlers, repositories and services. Each variant
/// maps to one HTTP status; the body is always `{"error": "..."}`, with `details` added
/// for field-level validation failures.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Validation failed")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// A third-party API (translation, email) answered with an error.
    #[error("{0}")]
    Upstream(String),

    /// An optional integration is not configured on this deployment.
    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(e) => match e {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::Forbidden(_) => StatusCode::FORBIDDEN,
                StorageError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AppError::InvalidInput(errors) => json!({
                "error": "Validation failed",
                "details": serde_json::to_value(errors).unwrap_or_default(),
            }),
            // Never echo driver messages to clients.
            AppError::Database(e) => {
                tracing::error!(error = ?e, "database error");
                json!({ "error": "Database operation failed" })
            }
            AppError::Storage(StorageError::Backend(m)) => {
                tracing::error!(error = %m, "storage backend error");
                json!({ "error": "Storage operation failed" })
            }
            AppError::Internal(m) => {
                tracing::error!(error = %m, "internal error");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
