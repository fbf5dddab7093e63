//! src/services/pantry_service.rs
//!
//! PantryService — the capacity-constrained assignment engine backed by
//! SQLite. Buckets have a fixed capacity; fruits reference at most one
//! bucket via a nullable `bucket_id`. Occupancy and valuation are always
//! derived by querying fruits, never cached on the bucket row.
//!
//! The two invariant-sensitive operations (`deposit`, `delete_bucket`)
//! perform their check and their write in a single conditional SQL
//! statement, so concurrent callers cannot overshoot a bucket's capacity
//! or delete a bucket between an emptiness check and the delete.

use crate::models::{
    bucket::{Bucket, BucketView},
    fruit::Fruit,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PantryError {
    #[error("capacity must be greater than zero")]
    InvalidCapacity,
    #[error("invalid fruit: {reason}")]
    InvalidFruit { reason: String },
    #[error("bucket `{0}` not found")]
    BucketNotFound(i64),
    #[error("fruit `{0}` not found")]
    FruitNotFound(i64),
    #[error("bucket `{0}` is not empty")]
    BucketNotEmpty(i64),
    #[error("bucket `{bucket}` is at full capacity ({capacity})")]
    CapacityExceeded { bucket: i64, capacity: i64 },
    #[error("fruit `{0}` is already in a bucket")]
    AlreadyAssigned(i64),
    #[error("fruit `{fruit}` is not in bucket `{bucket}`")]
    FruitNotInBucket { fruit: i64, bucket: i64 },
    #[error("no buckets found")]
    NoBuckets,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type PantryResult<T> = Result<T, PantryError>;

/// PantryService provides the core bucket/fruit operations:
/// - Create and delete buckets (deletion only when empty)
/// - Create and delete fruits
/// - Deposit a fruit into a bucket, enforcing capacity and exclusivity
/// - Withdraw a fruit from a bucket
/// - List buckets with derived occupancy and valuation
/// - Sweep expired fruits (used by the background reaper)
#[derive(Clone)]
pub struct PantryService {
    /// Shared SQLite connection pool. The store is the only coordination
    /// point between request handlers and the reaper.
    pub db: Arc<SqlitePool>,
}

impl PantryService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Fetch a bucket row by id.
    ///
    /// Returns BucketNotFound if missing.
    async fn fetch_bucket(&self, bucket_id: i64) -> PantryResult<Bucket> {
        sqlx::query_as::<_, Bucket>("SELECT id, capacity FROM buckets WHERE id = ?")
            .bind(bucket_id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => PantryError::BucketNotFound(bucket_id),
                other => PantryError::Sqlx(other),
            })
    }

    /// Fetch a fruit row by id.
    ///
    /// Returns FruitNotFound if missing.
    async fn fetch_fruit(&self, fruit_id: i64) -> PantryResult<Fruit> {
        sqlx::query_as::<_, Fruit>(
            "SELECT id, name, price, expires_at, bucket_id FROM fruits WHERE id = ?",
        )
        .bind(fruit_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => PantryError::FruitNotFound(fruit_id),
            other => PantryError::Sqlx(other),
        })
    }

    /// Count the fruits currently referencing a bucket.
    ///
    /// Always computed at call time; occupancy is never cached.
    async fn occupancy(&self, bucket_id: i64) -> PantryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fruits WHERE bucket_id = ?")
            .bind(bucket_id)
            .fetch_one(&*self.db)
            .await?;
        Ok(count)
    }

    /// Create a bucket with the given capacity.
    ///
    /// Returns InvalidCapacity unless `capacity > 0`.
    pub async fn create_bucket(&self, capacity: i64) -> PantryResult<Bucket> {
        if capacity <= 0 {
            return Err(PantryError::InvalidCapacity);
        }

        let bucket = sqlx::query_as::<_, Bucket>(
            "INSERT INTO buckets (capacity) VALUES (?) RETURNING id, capacity",
        )
        .bind(capacity)
        .fetch_one(&*self.db)
        .await?;

        Ok(bucket)
    }

    /// Delete a bucket, provided it is empty at the moment of deletion.
    ///
    /// The emptiness check and the delete are one conditional statement, so
    /// a deposit racing this call can never leave a fruit pointing at a
    /// deleted bucket. Zero rows affected is diagnosed afterwards into
    /// BucketNotFound or BucketNotEmpty.
    pub async fn delete_bucket(&self, bucket_id: i64) -> PantryResult<()> {
        let result = sqlx::query(
            "DELETE FROM buckets
             WHERE id = ?1
               AND NOT EXISTS (SELECT 1 FROM fruits WHERE bucket_id = ?1)",
        )
        .bind(bucket_id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            self.fetch_bucket(bucket_id).await?;
            return Err(PantryError::BucketNotEmpty(bucket_id));
        }

        Ok(())
    }

    /// List all buckets with their member fruits and derived fields,
    /// sorted by occupancy percentage descending.
    ///
    /// Relative order among buckets with equal occupancy is undefined.
    /// Returns NoBuckets when the bucket set is empty.
    pub async fn list_buckets(&self) -> PantryResult<Vec<BucketView>> {
        let buckets = sqlx::query_as::<_, Bucket>("SELECT id, capacity FROM buckets")
            .fetch_all(&*self.db)
            .await?;

        if buckets.is_empty() {
            return Err(PantryError::NoBuckets);
        }

        let assigned = sqlx::query_as::<_, Fruit>(
            "SELECT id, name, price, expires_at, bucket_id
             FROM fruits WHERE bucket_id IS NOT NULL",
        )
        .fetch_all(&*self.db)
        .await?;

        let mut members: HashMap<i64, Vec<Fruit>> = HashMap::new();
        for fruit in assigned {
            if let Some(bucket_id) = fruit.bucket_id {
                members.entry(bucket_id).or_default().push(fruit);
            }
        }

        let mut views: Vec<BucketView> = buckets
            .into_iter()
            .map(|bucket| {
                let fruits = members.remove(&bucket.id).unwrap_or_default();
                BucketView::derive(bucket, fruits)
            })
            .collect();

        views.sort_by(|a, b| {
            b.occupancy_percentage
                .partial_cmp(&a.occupancy_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(views)
    }

    /// Create a fruit with an absolute expiry computed from the TTL.
    ///
    /// Rejects empty names, non-positive prices, and non-positive TTLs, so
    /// the expiry always lies strictly in the future at creation time.
    pub async fn create_fruit(
        &self,
        name: &str,
        price: f64,
        ttl_seconds: i64,
    ) -> PantryResult<Fruit> {
        if name.trim().is_empty() {
            return Err(PantryError::InvalidFruit {
                reason: "name must not be empty".into(),
            });
        }
        if price <= 0.0 {
            return Err(PantryError::InvalidFruit {
                reason: "price must be greater than zero".into(),
            });
        }
        if ttl_seconds <= 0 {
            return Err(PantryError::InvalidFruit {
                reason: "expires_in_seconds must be greater than zero".into(),
            });
        }

        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);

        let fruit = sqlx::query_as::<_, Fruit>(
            "INSERT INTO fruits (name, price, expires_at) VALUES (?, ?, ?)
             RETURNING id, name, price, expires_at, bucket_id",
        )
        .bind(name)
        .bind(price)
        .bind(expires_at)
        .fetch_one(&*self.db)
        .await?;

        Ok(fruit)
    }

    /// Delete a fruit unconditionally, freeing its bucket slot if assigned.
    ///
    /// Idempotent: deleting a missing fruit is a no-op success.
    pub async fn delete_fruit(&self, fruit_id: i64) -> PantryResult<()> {
        sqlx::query("DELETE FROM fruits WHERE id = ?")
            .bind(fruit_id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    /// Deposit a fruit into a bucket.
    ///
    /// The capacity check, the exclusivity check, and the reference write
    /// execute as one conditional UPDATE, so two concurrent deposits cannot
    /// both observe a free slot and jointly overshoot the capacity. Zero
    /// rows affected is diagnosed afterwards, in order: missing bucket,
    /// full bucket, missing fruit, fruit already assigned.
    pub async fn deposit(&self, bucket_id: i64, fruit_id: i64) -> PantryResult<()> {
        let result = sqlx::query(
            "UPDATE fruits
             SET bucket_id = ?1
             WHERE id = ?2
               AND bucket_id IS NULL
               AND EXISTS (
                   SELECT 1 FROM buckets b
                   WHERE b.id = ?1
                     AND (SELECT COUNT(*) FROM fruits WHERE bucket_id = ?1) < b.capacity
               )",
        )
        .bind(bucket_id)
        .bind(fruit_id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // The write did not happen; work out which precondition failed.
        let bucket = self.fetch_bucket(bucket_id).await?;
        if self.occupancy(bucket_id).await? >= bucket.capacity {
            return Err(PantryError::CapacityExceeded {
                bucket: bucket_id,
                capacity: bucket.capacity,
            });
        }

        let fruit = self.fetch_fruit(fruit_id).await?;
        if fruit.bucket_id.is_some() {
            return Err(PantryError::AlreadyAssigned(fruit_id));
        }

        // Preconditions hold now but did not when the UPDATE ran; report
        // the slot as contended so the caller can retry.
        Err(PantryError::CapacityExceeded {
            bucket: bucket_id,
            capacity: bucket.capacity,
        })
    }

    /// Withdraw a fruit from a bucket.
    ///
    /// Clears the reference only if the fruit is currently in that bucket;
    /// otherwise reports FruitNotInBucket. Withdrawing twice yields the
    /// error the second time, never a crash.
    pub async fn withdraw(&self, bucket_id: i64, fruit_id: i64) -> PantryResult<()> {
        let result = sqlx::query("UPDATE fruits SET bucket_id = NULL WHERE id = ? AND bucket_id = ?")
            .bind(fruit_id)
            .bind(bucket_id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PantryError::FruitNotInBucket {
                fruit: fruit_id,
                bucket: bucket_id,
            });
        }

        Ok(())
    }

    /// Delete every fruit whose expiry has passed, in one bulk statement.
    ///
    /// Assigned fruits are removed too, freeing their bucket slot as a side
    /// effect. Returns the number of fruits removed.
    pub async fn sweep_expired(&self) -> PantryResult<u64> {
        let result = sqlx::query("DELETE FROM fruits WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> PantryService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");

        let schema = include_str!("../../migrations/0001_init.sql");
        for stmt in schema.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&pool).await.expect("migration");
        }

        PantryService::new(Arc::new(pool))
    }

    /// Insert a fruit with an explicit expiry, bypassing TTL validation.
    async fn insert_fruit_expiring_at(
        service: &PantryService,
        name: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> Fruit {
        sqlx::query_as::<_, Fruit>(
            "INSERT INTO fruits (name, price, expires_at) VALUES (?, 1.0, ?)
             RETURNING id, name, price, expires_at, bucket_id",
        )
        .bind(name)
        .bind(expires_at)
        .fetch_one(&*service.db)
        .await
        .expect("insert fruit")
    }

    #[tokio::test]
    async fn create_bucket_rejects_non_positive_capacity() {
        let service = test_service().await;
        assert!(matches!(
            service.create_bucket(0).await,
            Err(PantryError::InvalidCapacity)
        ));
        assert!(matches!(
            service.create_bucket(-3).await,
            Err(PantryError::InvalidCapacity)
        ));
    }

    #[tokio::test]
    async fn create_fruit_rejects_invalid_fields() {
        let service = test_service().await;
        assert!(matches!(
            service.create_fruit("", 1.0, 60).await,
            Err(PantryError::InvalidFruit { .. })
        ));
        assert!(matches!(
            service.create_fruit("apple", 0.0, 60).await,
            Err(PantryError::InvalidFruit { .. })
        ));
        // TTL of zero would mean an expiry that is not strictly in the future.
        assert!(matches!(
            service.create_fruit("apple", 1.0, 0).await,
            Err(PantryError::InvalidFruit { .. })
        ));
    }

    #[tokio::test]
    async fn created_fruit_is_unassigned_with_future_expiry() {
        let service = test_service().await;
        let before = Utc::now();
        let fruit = service.create_fruit("apple", 2.5, 3600).await.unwrap();

        assert_eq!(fruit.name, "apple");
        assert_eq!(fruit.bucket_id, None);
        assert!(fruit.expires_at > before);
    }

    #[tokio::test]
    async fn deposit_and_withdraw_round_trip() {
        let service = test_service().await;
        let bucket = service.create_bucket(1).await.unwrap();
        let apple = service.create_fruit("apple", 1.0, 3600).await.unwrap();
        let pear = service.create_fruit("pear", 1.5, 3600).await.unwrap();

        service.deposit(bucket.id, apple.id).await.unwrap();

        // Bucket is full; the second fruit is refused.
        assert!(matches!(
            service.deposit(bucket.id, pear.id).await,
            Err(PantryError::CapacityExceeded { .. })
        ));

        service.withdraw(bucket.id, apple.id).await.unwrap();
        service.deposit(bucket.id, pear.id).await.unwrap();
    }

    #[tokio::test]
    async fn deposit_rejects_already_assigned_fruit() {
        let service = test_service().await;
        let first = service.create_bucket(2).await.unwrap();
        let second = service.create_bucket(2).await.unwrap();
        let apple = service.create_fruit("apple", 1.0, 3600).await.unwrap();

        service.deposit(first.id, apple.id).await.unwrap();

        assert!(matches!(
            service.deposit(second.id, apple.id).await,
            Err(PantryError::AlreadyAssigned(id)) if id == apple.id
        ));
        // Depositing into the bucket it already occupies is refused too.
        assert!(matches!(
            service.deposit(first.id, apple.id).await,
            Err(PantryError::AlreadyAssigned(id)) if id == apple.id
        ));
    }

    #[tokio::test]
    async fn deposit_reports_missing_bucket_and_fruit() {
        let service = test_service().await;
        let bucket = service.create_bucket(1).await.unwrap();
        let apple = service.create_fruit("apple", 1.0, 3600).await.unwrap();

        assert!(matches!(
            service.deposit(999, apple.id).await,
            Err(PantryError::BucketNotFound(999))
        ));
        assert!(matches!(
            service.deposit(bucket.id, 999).await,
            Err(PantryError::FruitNotFound(999))
        ));
    }

    #[tokio::test]
    async fn concurrent_deposits_never_overshoot_capacity() {
        let service = test_service().await;
        let bucket = service.create_bucket(2).await.unwrap();

        let mut fruit_ids = Vec::new();
        for i in 0..6 {
            let fruit = service
                .create_fruit(&format!("fruit-{i}"), 1.0, 3600)
                .await
                .unwrap();
            fruit_ids.push(fruit.id);
        }

        let mut handles = Vec::new();
        for fruit_id in fruit_ids {
            let service = service.clone();
            let bucket_id = bucket.id;
            handles.push(tokio::spawn(async move {
                service.deposit(bucket_id, fruit_id).await
            }));
        }

        let mut succeeded = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => succeeded += 1,
                Err(PantryError::CapacityExceeded { .. }) => refused += 1,
                Err(other) => panic!("unexpected deposit error: {other}"),
            }
        }

        assert_eq!(succeeded, 2);
        assert_eq!(refused, 4);
        assert_eq!(service.occupancy(bucket.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn withdraw_is_idempotent_via_not_found() {
        let service = test_service().await;
        let bucket = service.create_bucket(1).await.unwrap();
        let apple = service.create_fruit("apple", 1.0, 3600).await.unwrap();

        // Never deposited: withdraw reports the fruit is not in the bucket.
        assert!(matches!(
            service.withdraw(bucket.id, apple.id).await,
            Err(PantryError::FruitNotInBucket { .. })
        ));

        service.deposit(bucket.id, apple.id).await.unwrap();
        service.withdraw(bucket.id, apple.id).await.unwrap();

        assert!(matches!(
            service.withdraw(bucket.id, apple.id).await,
            Err(PantryError::FruitNotInBucket { .. })
        ));
    }

    #[tokio::test]
    async fn delete_bucket_requires_emptiness() {
        let service = test_service().await;
        let bucket = service.create_bucket(3).await.unwrap();
        let apple = service.create_fruit("apple", 1.0, 3600).await.unwrap();
        service.deposit(bucket.id, apple.id).await.unwrap();

        assert!(matches!(
            service.delete_bucket(bucket.id).await,
            Err(PantryError::BucketNotEmpty(id)) if id == bucket.id
        ));

        service.withdraw(bucket.id, apple.id).await.unwrap();
        service.delete_bucket(bucket.id).await.unwrap();

        assert!(matches!(
            service.delete_bucket(bucket.id).await,
            Err(PantryError::BucketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_fruit_frees_slot_and_is_idempotent() {
        let service = test_service().await;
        let bucket = service.create_bucket(1).await.unwrap();
        let apple = service.create_fruit("apple", 1.0, 3600).await.unwrap();
        service.deposit(bucket.id, apple.id).await.unwrap();

        service.delete_fruit(apple.id).await.unwrap();
        assert_eq!(service.occupancy(bucket.id).await.unwrap(), 0);

        // Deleting again is a no-op success.
        service.delete_fruit(apple.id).await.unwrap();
    }

    #[tokio::test]
    async fn list_buckets_orders_by_occupancy_descending() {
        let service = test_service().await;

        assert!(matches!(
            service.list_buckets().await,
            Err(PantryError::NoBuckets)
        ));

        // 0%, 100%, and 50% occupancy respectively.
        let empty = service.create_bucket(4).await.unwrap();
        let full = service.create_bucket(1).await.unwrap();
        let half = service.create_bucket(2).await.unwrap();

        let apple = service.create_fruit("apple", 2.0, 3600).await.unwrap();
        let pear = service.create_fruit("pear", 3.0, 3600).await.unwrap();
        service.deposit(full.id, apple.id).await.unwrap();
        service.deposit(half.id, pear.id).await.unwrap();

        let views = service.list_buckets().await.unwrap();
        let order: Vec<i64> = views.iter().map(|v| v.id).collect();
        assert_eq!(order, vec![full.id, half.id, empty.id]);

        assert_eq!(views[0].occupancy_percentage, 100.0);
        assert_eq!(views[0].total_value, 2.0);
        assert_eq!(views[1].occupancy_percentage, 50.0);
        assert_eq!(views[1].total_value, 3.0);
        assert_eq!(views[2].occupancy_percentage, 0.0);
        assert_eq!(views[2].total_value, 0.0);
    }

    #[tokio::test]
    async fn sweep_removes_expired_fruits_and_frees_slots() {
        let service = test_service().await;
        let bucket = service.create_bucket(2).await.unwrap();

        let stale = insert_fruit_expiring_at(
            &service,
            "stale",
            Utc::now() - Duration::seconds(5),
        )
        .await;
        service.deposit(bucket.id, stale.id).await.unwrap();

        let fresh = service.create_fruit("fresh", 1.0, 3600).await.unwrap();
        service.deposit(bucket.id, fresh.id).await.unwrap();

        let removed = service.sweep_expired().await.unwrap();
        assert_eq!(removed, 1);

        assert!(matches!(
            service.fetch_fruit(stale.id).await,
            Err(PantryError::FruitNotFound(_))
        ));
        assert_eq!(service.occupancy(bucket.id).await.unwrap(), 1);

        // Nothing left to reap; the count is zero, not an error.
        assert_eq!(service.sweep_expired().await.unwrap(), 0);
    }
}
