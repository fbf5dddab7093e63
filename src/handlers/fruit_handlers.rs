//! HTTP handlers for fruit operations.

use crate::{
    errors::AppError,
    models::fruit::CreateFruitRequest,
    services::pantry_service::PantryService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// `POST /v1/fruits` — create a fruit with a TTL in seconds.
pub async fn create_fruit(
    State(service): State<PantryService>,
    Json(payload): Json<CreateFruitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fruit = service
        .create_fruit(&payload.name, payload.price, payload.expires_in_seconds)
        .await?;
    Ok((StatusCode::CREATED, Json(fruit)))
}

/// `DELETE /v1/fruits/{fruit_id}` — delete a fruit permanently.
///
/// Deleting a fruit that does not exist is a no-op success.
pub async fn delete_fruit(
    State(service): State<PantryService>,
    Path(fruit_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_fruit(fruit_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
