use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use studyspace_core::booking::BookingRequest;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{booking_id}", delete(cancel_booking))
}

// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.engine.create_booking(&req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
struct CancelParams {
    library_id: String,
}

// DELETE /v1/bookings/{booking_id}?library_id=...
async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Query(params): Query<CancelParams>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .cancel_booking(&params.library_id, booking_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
