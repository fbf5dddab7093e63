//! Defines routes for all bucket and fruit operations.
//!
//! ## Structure
//! - **Bucket endpoints**
//!   - `GET    /v1/buckets` — list buckets with derived fields
//!   - `POST   /v1/buckets` — create bucket
//!   - `DELETE /v1/buckets/{bucket_id}` — delete bucket (must be empty)
//!   - `POST   /v1/buckets/{bucket_id}/fruits` — deposit a fruit
//!   - `DELETE /v1/buckets/{bucket_id}/fruits/{fruit_id}` — withdraw a fruit
//!
//! - **Fruit endpoints**
//!   - `POST   /v1/fruits` — create fruit
//!   - `DELETE /v1/fruits/{fruit_id}` — delete fruit

use crate::{
    handlers::{
        bucket_handlers::{
            create_bucket, delete_bucket, deposit_fruit, list_buckets, withdraw_fruit,
        },
        fruit_handlers::{create_fruit, delete_fruit},
        health_handlers::{healthz, readyz},
    },
    services::pantry_service::PantryService,
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Build and return the router for the whole API surface.
///
/// The router carries shared state (`PantryService`) to all handlers.
pub fn routes() -> Router<PantryService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Bucket routes
        .route("/v1/buckets", get(list_buckets).post(create_bucket))
        .route("/v1/buckets/{bucket_id}", delete(delete_bucket))
        .route("/v1/buckets/{bucket_id}/fruits", post(deposit_fruit))
        .route(
            "/v1/buckets/{bucket_id}/fruits/{fruit_id}",
            delete(withdraw_fruit),
        )
        // Fruit routes
        .route("/v1/fruits", post(create_fruit))
        .route("/v1/fruits/{fruit_id}", delete(delete_fruit))
}
