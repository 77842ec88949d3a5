//! Error-to-response mapping.
//!
//! Every failure leaves the handler as an `ApiError`. The response carries an
//! `ErrorPayload` extension with the message key so the locale middleware can
//! swap in the translated text.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use planner_core::generator::GenerateError;
use planner_core::model::{ProgressValueError, StudyItemError};
use serde_json::json;
use services::{CalendarServiceError, StudyItemServiceError, StudySessionServiceError};
use storage::repository::StorageError;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error(transparent)]
    Items(#[from] StudyItemServiceError),
    #[error(transparent)]
    Sessions(#[from] StudySessionServiceError),
    #[error(transparent)]
    Calendar(#[from] CalendarServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Progress(#[from] ProgressValueError),
    #[error("invalid request body: {0}")]
    Body(String),
    #[error("invalid query string: {0}")]
    Query(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Query(rejection.body_text())
    }
}

/// Untranslated error details attached to error responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub key: &'static str,
    pub details: String,
}

const NOT_FOUND: (StatusCode, &str) = (StatusCode::NOT_FOUND, "errors.notFound");
const CONFLICT: (StatusCode, &str) = (StatusCode::CONFLICT, "errors.conflict");
const INTERNAL: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "errors.internal");
const INVALID_INPUT: (StatusCode, &str) = (StatusCode::BAD_REQUEST, "errors.invalidInput");
const INVALID_TIME_RANGE: (StatusCode, &str) =
    (StatusCode::BAD_REQUEST, "errors.invalidTimeRange");
const DATE_OUT_OF_RANGE: (StatusCode, &str) =
    (StatusCode::BAD_REQUEST, "errors.dateOutOfRange");

fn storage_status(err: &StorageError) -> (StatusCode, &'static str) {
    match err {
        StorageError::NotFound => NOT_FOUND,
        StorageError::Conflict => CONFLICT,
        _ => INTERNAL,
    }
}

impl ApiError {
    /// HTTP status and message key for this error.
    #[must_use]
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Items(err) => match err {
                StudyItemServiceError::NotFound => NOT_FOUND,
                StudyItemServiceError::ProgressLocked => {
                    (StatusCode::CONFLICT, "errors.progressLocked")
                }
                StudyItemServiceError::Item(StudyItemError::EmptyTitle) => {
                    (StatusCode::BAD_REQUEST, "errors.emptyTitle")
                }
                StudyItemServiceError::Item(StudyItemError::InvalidPriority(_)) => {
                    (StatusCode::BAD_REQUEST, "errors.invalidPriority")
                }
                StudyItemServiceError::Generate(GenerateError::DateOutOfRange { .. }) => {
                    DATE_OUT_OF_RANGE
                }
                StudyItemServiceError::Generate(_) => (StatusCode::BAD_REQUEST, "errors.invalidHours"),
                StudyItemServiceError::Session(_) => INVALID_TIME_RANGE,
                StudyItemServiceError::Storage(err) => storage_status(err),
                _ => INVALID_INPUT,
            },
            ApiError::Sessions(err) => match err {
                StudySessionServiceError::NotFound | StudySessionServiceError::ItemNotFound => {
                    NOT_FOUND
                }
                StudySessionServiceError::EmptyBatch => (StatusCode::BAD_REQUEST, "errors.emptyBatch"),
                StudySessionServiceError::NoChanges => (StatusCode::BAD_REQUEST, "errors.noFields"),
                StudySessionServiceError::Session(_) => INVALID_TIME_RANGE,
                StudySessionServiceError::Storage(err) => storage_status(err),
                _ => INTERNAL,
            },
            ApiError::Calendar(err) => match err {
                CalendarServiceError::WeekOutOfRange { .. } => DATE_OUT_OF_RANGE,
                CalendarServiceError::Storage(err) => storage_status(err),
                _ => INTERNAL,
            },
            ApiError::Storage(err) => storage_status(err),
            ApiError::Progress(_) => (StatusCode::BAD_REQUEST, "errors.invalidProgress"),
            ApiError::Body(_) | ApiError::Query(_) => INVALID_INPUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, key) = self.classify();
        let details = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), %details, "request failed");
        } else {
            debug!(status = status.as_u16(), %details, "request rejected");
        }

        let mut response = (
            status,
            Json(json!({
                "error": key,
                "details": details,
            })),
        )
            .into_response();
        response.extensions_mut().insert(ErrorPayload { key, details });
        response
    }
}
