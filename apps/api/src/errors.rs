use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::editor::PageError;
use crate::export::ExportError;
use crate::models::ValidationError;
use crate::session::NotConfirmed;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        AppError::NotFound(err.to_string())
    }
}

impl From<NotConfirmed> for AppError {
    fn from(err: NotConfirmed) -> Self {
        AppError::ConfirmationRequired(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::ConfirmationRequired(msg) => (
                StatusCode::CONFLICT,
                "CONFIRMATION_REQUIRED",
                msg.clone(),
            ),
            AppError::Export(e) => match e {
                ExportError::DependencyMissing(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DEPENDENCY_MISSING",
                    e.to_string(),
                ),
                ExportError::InProgress => (
                    StatusCode::CONFLICT,
                    "EXPORT_IN_PROGRESS",
                    e.to_string(),
                ),
                ExportError::RegionNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                ExportError::Capture(_) | ExportError::Assembly(_) => {
                    tracing::error!("Export error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "EXPORT_FAILED",
                        e.to_string(),
                    )
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
