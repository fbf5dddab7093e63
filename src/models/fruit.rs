//! Represents a perishable fruit, optionally assigned to a bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A fruit in the pantry.
///
/// A fruit belongs to at most one bucket at a time; `bucket_id` is `None`
/// while it is free-floating. Once `expires_at` passes, the fruit is removed
/// by the background reaper regardless of bucket membership.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Fruit {
    /// Unique identifier, allocated by the database on insert.
    pub id: i64,

    /// Descriptive label, never empty.
    pub name: String,

    /// Unit price, strictly positive.
    pub price: f64,

    /// Absolute expiry deadline, computed at creation from the caller's TTL.
    pub expires_at: DateTime<Utc>,

    /// Bucket this fruit currently occupies, if any.
    pub bucket_id: Option<i64>,
}

/// Request body for creating a fruit. The caller supplies a relative TTL;
/// the service converts it into an absolute `expires_at`.
#[derive(Deserialize, Debug)]
pub struct CreateFruitRequest {
    pub name: String,
    pub price: f64,
    pub expires_in_seconds: i64,
}
