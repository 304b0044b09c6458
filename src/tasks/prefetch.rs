//! Prefetch Task
//!
//! Drains the warm-up queue filled by [`CacheManager::warmup`], producing and
//! storing one value per request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{error::TryRecvError, Receiver};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, PrefetchJob};

/// Spawns the prefetch loop over `queue`.
///
/// Pending requests are processed back to back; when the queue is empty the
/// loop sleeps for `poll_interval`. A failing producer only loses its own
/// request.
pub fn spawn_prefetch_task(
    manager: Arc<CacheManager>,
    mut queue: Receiver<PrefetchJob>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting prefetch task with poll interval of {:?}", poll_interval);

        loop {
            match queue.try_recv() {
                Ok(job) => {
                    let key = job.key.clone();
                    if manager.run_prefetch_job(job).await {
                        debug!(%key, "prefetched value stored");
                    }
                }
                Err(TryRecvError::Empty) => tokio::time::sleep(poll_interval).await,
                Err(TryRecvError::Disconnected) => {
                    warn!("Prefetch queue closed, stopping prefetch task");
                    break;
                }
            }
        }
    })
}
