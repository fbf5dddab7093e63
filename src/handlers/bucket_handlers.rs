//! HTTP handlers for bucket operations.
//!
//! Thin adapters over `PantryService`: decode the request, invoke the
//! engine, and map results into JSON responses. All invariant enforcement
//! lives in the service layer.

use crate::{errors::AppError, services::pantry_service::PantryService};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

/// Request body for `POST /v1/buckets`.
#[derive(Debug, Deserialize)]
pub struct CreateBucketRequest {
    pub capacity: i64,
}

/// Request body for `POST /v1/buckets/{bucket_id}/fruits`.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub fruit_id: i64,
}

/// `POST /v1/buckets` — create a bucket.
pub async fn create_bucket(
    State(service): State<PantryService>,
    Json(payload): Json<CreateBucketRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bucket = service.create_bucket(payload.capacity).await?;
    Ok((StatusCode::CREATED, Json(bucket)))
}

/// `GET /v1/buckets` — list buckets with derived fields, ordered by
/// occupancy percentage descending.
pub async fn list_buckets(
    State(service): State<PantryService>,
) -> Result<impl IntoResponse, AppError> {
    let views = service.list_buckets().await?;
    Ok(Json(views))
}

/// `DELETE /v1/buckets/{bucket_id}` — delete an empty bucket.
pub async fn delete_bucket(
    State(service): State<PantryService>,
    Path(bucket_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_bucket(bucket_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /v1/buckets/{bucket_id}/fruits` — deposit a fruit.
pub async fn deposit_fruit(
    State(service): State<PantryService>,
    Path(bucket_id): Path<i64>,
    Json(payload): Json<DepositRequest>,
) -> Result<impl IntoResponse, AppError> {
    service.deposit(bucket_id, payload.fruit_id).await?;
    Ok(Json(json!({ "message": "fruit deposited" })))
}

/// `DELETE /v1/buckets/{bucket_id}/fruits/{fruit_id}` — withdraw a fruit.
pub async fn withdraw_fruit(
    State(service): State<PantryService>,
    Path((bucket_id, fruit_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    service.withdraw(bucket_id, fruit_id).await?;
    Ok(Json(json!({ "message": "fruit withdrawn" })))
}
