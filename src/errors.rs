use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::api::ApiError;
use crate::services::wizard::WizardError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("backend error: {0}")]
    Backend(#[from] ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Wizard(e) => match e {
                WizardError::Validation(_)
                | WizardError::MissingService
                | WizardError::MissingDateTime
                | WizardError::DateInPast(_)
                | WizardError::SlotUnavailable(_)
                | WizardError::SlotExpired => StatusCode::UNPROCESSABLE_ENTITY,
                WizardError::WrongStep(_)
                | WizardError::SubmissionInProgress
                | WizardError::AlreadyBooked => StatusCode::CONFLICT,
                WizardError::Availability(_) => StatusCode::BAD_GATEWAY,
            },
            AppError::Backend(e) => match e {
                ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::Conflict(_) => StatusCode::CONFLICT,
                ApiError::Http { .. } | ApiError::Network(_) | ApiError::Decode(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match &self {
            AppError::Wizard(WizardError::Validation(errors)) => serde_json::json!({
                "error": self.to_string(),
                "fields": errors.errors,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
