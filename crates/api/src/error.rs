//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::LendingError;
use projections::ProjectionError;

/// Body message for failures whose detail stays in the logs.
const INTERNAL_MESSAGE: &str = "Internal server error.";

/// API-level error type that maps to HTTP responses.
///
/// Every variant renders as `{"message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found, or a list view came back empty.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Lending operation error.
    Lending(LendingError),
    /// Read view error.
    Projection(ProjectionError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Lending(err) => lending_error_to_response(err),
            ApiError::Projection(err) => {
                tracing::error!(error = %err, "read view failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn lending_error_to_response(err: LendingError) -> (StatusCode, String) {
    match &err {
        LendingError::Validation(_) | LendingError::Forbidden(_) | LendingError::Conflict(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        LendingError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        LendingError::PersistenceFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        LendingError::Store(_) | LendingError::Media(_) => {
            tracing::error!(error = %err, "lending operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        ApiError::Lending(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}
