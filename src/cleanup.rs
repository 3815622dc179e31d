//! Scheduled sweep of expired revocation entries and idle rate-limit buckets.

use crate::db::Database;
use crate::rate_limit::RateLimitConfig;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database, rate_limit: &RateLimitConfig) {
    match db.revocations().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired revocation entries", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up revocation entries: {}", e),
    }

    rate_limit.retain_recent();
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(
    db: Database,
    rate_limit: RateLimitConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately; startup already swept.
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&db, &rate_limit).await;
        }
    })
}
