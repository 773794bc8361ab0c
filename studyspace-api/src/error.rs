use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use studyspace_core::BookingError;

/// HTTP wrapper around the engine's error taxonomy. Conflict responses
/// carry the offending window so clients can explain why a slot is taken.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub BookingError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            BookingError::InvalidRequest(_) | BookingError::InvalidDuration(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.0.to_string() }),
            ),
            BookingError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": self.0.to_string() }),
            ),
            BookingError::SeatConflict { start, end }
            | BookingError::StudentConflict { start, end } => (
                StatusCode::CONFLICT,
                json!({
                    "error": self.0.to_string(),
                    "conflict": { "start": start, "end": end },
                }),
            ),
            BookingError::TransientFailure { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.0.to_string(), "retryable": true }),
            ),
            BookingError::Store(err) => {
                tracing::error!("storage error surfaced to API: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
