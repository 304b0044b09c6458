//! Stats Snapshot Task
//!
//! Periodically persists the statistics to the remote tier so they can be
//! inspected from outside the process.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, STATS_SNAPSHOT_KEY};

/// Spawns the stats snapshot loop.
pub fn spawn_stats_snapshot_task(manager: Arc<CacheManager>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting stats snapshot task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            if manager.snapshot_stats().await {
                debug!(key = STATS_SNAPSHOT_KEY, "stats snapshot written");
            } else {
                warn!(key = STATS_SNAPSHOT_KEY, "stats snapshot not written");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryRemote, RemoteStore, DEFAULT_NAMESPACE};
    use crate::config::Config;

    #[tokio::test]
    async fn test_snapshot_task_writes_reserved_key() {
        let remote = Arc::new(MemoryRemote::new());
        let manager = Arc::new(CacheManager::new(Config::default(), remote.clone()).unwrap());
        manager.get("missing", DEFAULT_NAMESPACE).await;

        let handle = spawn_stats_snapshot_task(manager, Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        let bytes = remote.get(STATS_SNAPSHOT_KEY).await.unwrap();
        let snapshot: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(snapshot["all"]["misses"], 1);
    }

    #[tokio::test]
    async fn test_snapshot_task_survives_remote_outage() {
        let remote = Arc::new(MemoryRemote::new());
        remote.set_available(false);
        let manager = Arc::new(CacheManager::new(Config::default(), remote.clone()).unwrap());

        let handle = spawn_stats_snapshot_task(manager, Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        remote.set_available(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(remote.get(STATS_SNAPSHOT_KEY).await.is_some());

        handle.abort();
    }
}
