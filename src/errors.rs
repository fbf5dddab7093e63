use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::pantry_service::PantryError;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Map engine errors onto transport status codes in one place.
///
/// Capacity and exclusivity violations are caller errors (400), missing
/// entities are 404, and storage faults surface as 500 so callers can tell
/// a retryable system fault from a request they must change.
impl From<PantryError> for AppError {
    fn from(err: PantryError) -> Self {
        let status = match &err {
            PantryError::InvalidCapacity | PantryError::InvalidFruit { .. } => {
                StatusCode::BAD_REQUEST
            }
            PantryError::BucketNotEmpty(_)
            | PantryError::CapacityExceeded { .. }
            | PantryError::AlreadyAssigned(_) => StatusCode::BAD_REQUEST,
            PantryError::BucketNotFound(_)
            | PantryError::FruitNotFound(_)
            | PantryError::FruitNotInBucket { .. }
            | PantryError::NoBuckets => StatusCode::NOT_FOUND,
            PantryError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        AppError::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
