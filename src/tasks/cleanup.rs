//! Expiry Cleanup Task
//!
//! Background task that periodically purges expired entries from the hot and
//! warm tiers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns the cleanup loop.
///
/// The loop sleeps for `interval` before every pass, so the first purge
/// happens one interval after startup. Each pass also stamps `last_cleanup`
/// on the statistics.
pub fn spawn_cleanup_task(manager: Arc<CacheManager>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = manager.run_cleanup().await;
            if removed > 0 {
                info!("Cleanup: removed {} expired local entries", removed);
            } else {
                debug!("Cleanup: no expired local entries found");
            }
        }
    })
}
