use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Insufficient points")]
    InsufficientQuota,

    #[error("Article text is empty")]
    EmptyInput,

    #[error("Summarization backend is not configured")]
    UpstreamUnavailable,

    #[error("Summarization failed ({status}): {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Render timed out")]
    RenderTimeout,

    #[error("Render failed: {0}")]
    RenderFailure(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::InsufficientQuota => {
                (StatusCode::PAYMENT_REQUIRED, "Insufficient points".to_string())
            }
            AppError::EmptyInput => {
                (StatusCode::BAD_REQUEST, "Article text is empty".to_string())
            }
            AppError::UpstreamUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Summarization backend is not configured".to_string(),
            ),
            AppError::UpstreamError { status, ref message } => {
                tracing::warn!("Summarization upstream returned {}: {}", status, message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            AppError::RenderTimeout => {
                (StatusCode::GATEWAY_TIMEOUT, "Render timed out".to_string())
            }
            AppError::RenderFailure(ref msg) => {
                tracing::error!("Render failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "Render failed".to_string())
            }
            AppError::Persistence(ref msg) => {
                tracing::error!("Persistence failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save card".to_string())
            }
            AppError::Storage(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Access forbidden".to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
