//! Background Tasks Module
//!
//! Long-running loops that keep the cache healthy while it is in use.
//!
//! # Tasks
//! - Cleanup: purges expired local entries
//! - Prefetch: fills the cache from queued warm-up requests
//! - Stats snapshot: persists statistics to the remote tier

mod cleanup;
mod prefetch;
mod stats_snapshot;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::CacheManager;

pub use cleanup::spawn_cleanup_task;
pub use prefetch::spawn_prefetch_task;
pub use stats_snapshot::spawn_stats_snapshot_task;

/// Handles of the running background loops. Dropping it stops them.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Number of loops still running.
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Aborts every loop.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        warn!("Background tasks aborted");
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Starts the cleanup, prefetch and stats snapshot loops for `manager`,
/// with intervals from its configuration.
///
/// The prefetch loop is only started by the first call; later calls find the
/// queue already taken and start the other two loops alone.
pub async fn spawn_background_tasks(manager: Arc<CacheManager>) -> BackgroundTasks {
    let config = manager.config().clone();
    let mut handles = vec![spawn_cleanup_task(
        manager.clone(),
        Duration::from_secs(config.cleanup_interval_secs),
    )];

    match manager.take_prefetch_receiver().await {
        Some(queue) => handles.push(spawn_prefetch_task(
            manager.clone(),
            queue,
            Duration::from_millis(config.prefetch_interval_ms),
        )),
        None => warn!("Prefetch queue already consumed, prefetch task not started"),
    }

    handles.push(spawn_stats_snapshot_task(
        manager,
        Duration::from_secs(config.stats_interval_secs),
    ));

    info!("{} background tasks started", handles.len());
    BackgroundTasks { handles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheValue, MemoryRemote};
    use crate::config::Config;

    fn manager() -> Arc<CacheManager> {
        let config = Config {
            prefetch_interval_ms: 10,
            ..Config::default()
        };
        Arc::new(CacheManager::new(config, Arc::new(MemoryRemote::new())).unwrap())
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let manager = manager();
        let mut tasks = spawn_background_tasks(manager.clone()).await;
        assert_eq!(tasks.running(), 3);

        manager.warmup(
            vec![("k".to_string(), || async { Ok(CacheValue::from("v")) })],
            "boot",
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.get("k", "boot").await, Some(CacheValue::from("v")));

        tasks.shutdown();
        assert_eq!(tasks.running(), 0);
    }

    #[tokio::test]
    async fn test_second_spawn_skips_prefetch() {
        let manager = manager();
        let _first = spawn_background_tasks(manager.clone()).await;
        let second = spawn_background_tasks(manager).await;
        assert_eq!(second.running(), 2);
    }
}
