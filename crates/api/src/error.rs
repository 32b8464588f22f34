//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::PlacementError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order placement failed.
    Placement(PlacementError),
    /// Store error outside of order placement.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Placement(err) => placement_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn placement_error_to_response(err: PlacementError) -> (StatusCode, String) {
    match &err {
        PlacementError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        PlacementError::CustomerNotFound { .. } | PlacementError::ProductNotFound { .. } => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        PlacementError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        PlacementError::Persistence(_) => {
            tracing::error!(error = %err, "order placement hit a store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        _ => {
            tracing::error!(error = %err, "internal server error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        ApiError::Placement(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
