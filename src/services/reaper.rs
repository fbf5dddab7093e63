//! Background expiration reaper.
//!
//! A perpetual loop that sweeps expired fruits out of the store on a fixed
//! interval. It shares nothing with the request handlers except the SQLite
//! pool inside `PantryService`; there is no call path between the two.

use crate::services::pantry_service::PantryService;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically deletes fruits whose expiry has passed.
///
/// The loop alternates between waiting for the next tick and running one
/// sweep. Cancellation stops future ticks; a sweep already underway runs to
/// completion. Sweep failures are logged and retried on the next tick.
pub struct Reaper {
    service: PantryService,
    interval: Duration,
    shutdown: CancellationToken,
}

impl Reaper {
    pub fn new(service: PantryService, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            service,
            interval,
            shutdown,
        }
    }

    /// Run the sweep loop until the shutdown token is cancelled.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; consume it
        // so the first sweep happens one full interval after startup.
        ticker.tick().await;

        info!("expiration reaper started (interval {:?})", self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("expiration reaper stopping");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.service.sweep_expired().await {
                Ok(0) => debug!("sweep complete, nothing expired"),
                Ok(removed) => info!("removed {removed} expired fruit(s)"),
                // The interval already rate-limits retries; the next tick
                // attempts the sweep again unconditionally.
                Err(err) => warn!("expiration sweep failed: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

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

    #[tokio::test]
    async fn reaper_sweeps_expired_fruits_until_cancelled() {
        let service = test_service().await;

        sqlx::query("INSERT INTO fruits (name, price, expires_at) VALUES ('stale', 1.0, ?)")
            .bind(Utc::now() - chrono::Duration::seconds(10))
            .execute(&*service.db)
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let reaper = Reaper::new(
            service.clone(),
            Duration::from_millis(20),
            shutdown.clone(),
        );
        let handle = tokio::spawn(reaper.run());

        // Give the loop a few ticks to notice the expired fruit.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fruits")
            .fetch_one(&*service.db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_reaper_stops_promptly() {
        let service = test_service().await;
        let shutdown = CancellationToken::new();
        let reaper = Reaper::new(service, Duration::from_secs(3600), shutdown.clone());
        let handle = tokio::spawn(reaper.run());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper did not stop after cancellation")
            .unwrap();
    }
}
