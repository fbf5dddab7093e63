//! Represents a bucket — a fixed-capacity container for fruits.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::fruit::Fruit;

/// A storage bucket with a fixed capacity.
///
/// Buckets never hold references to their member fruits; membership lives on
/// the fruit side as a nullable `bucket_id`, and occupancy is always derived
/// by counting fruits that point at the bucket.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Bucket {
    /// Unique identifier, allocated by the database on insert.
    pub id: i64,

    /// Maximum number of fruits this bucket can hold. Fixed at creation.
    pub capacity: i64,
}

/// A bucket together with its derived fields, produced for listings.
///
/// `total_value` and `occupancy_percentage` are computed from the current
/// member set on every call; they are never cached or stored.
#[derive(Serialize, Debug)]
pub struct BucketView {
    pub id: i64,
    pub capacity: i64,
    pub fruits: Vec<Fruit>,
    pub total_value: f64,
    pub occupancy_percentage: f64,
}

impl BucketView {
    /// Build a view from a bucket record and its current member fruits.
    pub fn derive(bucket: Bucket, fruits: Vec<Fruit>) -> Self {
        let total_value = fruits.iter().map(|f| f.price).sum();
        let occupancy_percentage = if bucket.capacity > 0 {
            (fruits.len() as f64 / bucket.capacity as f64) * 100.0
        } else {
            0.0
        };

        Self {
            id: bucket.id,
            capacity: bucket.capacity,
            fruits,
            total_value,
            occupancy_percentage,
        }
    }
}
