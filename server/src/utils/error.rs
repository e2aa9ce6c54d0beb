use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::records::RecordError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Record(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            AppError::Record(err) => match err {
                RecordError::EventNotFound(_) | RecordError::RecordNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                RecordError::DuplicateSlug(_) | RecordError::DuplicateBooking { .. } => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Record(err) => match err {
                RecordError::MissingField(_) => "MISSING_FIELD",
                RecordError::FieldTooLong { .. } => "FIELD_TOO_LONG",
                RecordError::InvalidDateFormat(_) => "INVALID_DATE_FORMAT",
                RecordError::InvalidTimeFormat(_) => "INVALID_TIME_FORMAT",
                RecordError::EmptyRequiredList(_) => "EMPTY_REQUIRED_LIST",
                RecordError::InvalidEmailFormat(_) => "INVALID_EMAIL_FORMAT",
                RecordError::EventNotFound(_) => "EVENT_NOT_FOUND",
                RecordError::RecordNotFound(_) => "NOT_FOUND",
                RecordError::DuplicateSlug(_) => "DUPLICATE_SLUG",
                RecordError::DuplicateBooking { .. } => "DUPLICATE_BOOKING",
                RecordError::StorageFailure(_) => "STORAGE_FAILURE",
            },
        }
    }

    fn log(&self) {
        match self {
            AppError::Record(RecordError::StorageFailure(e)) => {
                error!(error = ?e, "Storage failure");
            }
            other => {
                warn!(code = other.code(), message = %other, "Request rejected");
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Record(RecordError::MissingField(field))
            | AppError::Record(RecordError::EmptyRequiredList(field)) => {
                Some(json!({ "field": field }))
            }
            AppError::Record(RecordError::FieldTooLong { field, max }) => {
                Some(json!({ "field": field, "max": max }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::Record(RecordError::StorageFailure(_)) => {
                "A storage error occurred".to_string()
            }
            other => other.to_string(),
        };

        error_response(code, public_message, self.details(), status)
    }
}
