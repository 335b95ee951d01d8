use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found")]
    NotFound,

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    #[error("Remote read failed: {0}")]
    RemoteReadFailed(String),

    #[error("Remote delete failed: {0}")]
    RemoteDeleteFailed(String),

    /// The blob named `storage_name` is on the remote store without a catalog row
    #[error("Metadata write failed for {storage_name}: {reason}")]
    MetadataWriteFailed {
        storage_name: String,
        reason: String,
    },

    #[error("Metadata delete failed: {0}")]
    MetadataDeleteFailed(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "Invalid argument"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"),
            AppError::RemoteWriteFailed(_)
            | AppError::RemoteReadFailed(_)
            | AppError::RemoteDeleteFailed(_) => {
                tracing::error!("Remote store error: {}", self);
                (StatusCode::BAD_GATEWAY, "Remote store error")
            }
            AppError::MetadataWriteFailed { .. } | AppError::MetadataDeleteFailed(_) => {
                tracing::error!("Metadata error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Metadata error")
            }
            AppError::DatabaseError(_) => {
                tracing::error!("Database error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::ServerError(_) => {
                tracing::error!("Server error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}
