//! Cache Manager
//!
//! Sequences lookups across the hot, warm and remote tiers, promotes values
//! toward the faster tiers, and owns the statistics, metrics and prefetch
//! queue the background tasks operate on.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::entry::Metadata;
use crate::cache::key::{build_key, namespace_pattern, DEFAULT_NAMESPACE};
use crate::cache::value::{deserialize, serialize};
use crate::cache::{
    CacheEntry, CacheMetrics, CacheStats, CacheValue, LocalTier, RemoteStore, StatsBook, TierKind,
    HEALTH_CHECK_KEY, STATS_SNAPSHOT_KEY,
};
use crate::config::Config;
use crate::error::Result;

/// Boxed future returned by prefetch producers.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Produces the value for a prefetch request.
pub type PrefetchProducer = Box<dyn FnOnce() -> BoxFuture<anyhow::Result<CacheValue>> + Send>;

/// A queued warm-up request.
pub struct PrefetchJob {
    pub key: String,
    pub namespace: String,
    pub producer: PrefetchProducer,
}

// == Set Options ==
/// Optional arguments of [`CacheManager::set`].
#[derive(Debug, Clone)]
pub struct SetOptions {
    /// Remote expiry in seconds; `None` or `0` stores without expiry
    pub ttl: Option<u64>,
    pub namespace: String,
    pub metadata: Option<Metadata>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            metadata: None,
        }
    }
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl = Some(ttl_secs);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// == Cache Manager ==
/// The public entry point of the tiered cache.
///
/// Construct one per process and share it behind an `Arc`. Public operations
/// never fail for operational reasons: misses come back as `None`, failed
/// writes as `false`, and failed bulk removals as `0`.
///
/// Lock order is warm before hot. Writers bump `generation` while holding
/// the warm lock; a lookup only promotes when no write happened since it
/// started, so a promotion can never resurrect a value a later write replaced.
pub struct CacheManager {
    config: Config,
    generation: AtomicU64,
    hot: Mutex<LocalTier>,
    warm: Mutex<LocalTier>,
    remote: Arc<dyn RemoteStore>,
    stats: Mutex<StatsBook>,
    metrics: CacheMetrics,
    prefetch_tx: mpsc::Sender<PrefetchJob>,
    prefetch_rx: Mutex<Option<mpsc::Receiver<PrefetchJob>>>,
}

impl CacheManager {
    // == Constructor ==
    /// Builds the tiers from `config`. Fails only for invalid configuration.
    pub fn new(config: Config, remote: Arc<dyn RemoteStore>) -> Result<Self> {
        config.validate()?;

        let (prefetch_tx, prefetch_rx) = mpsc::channel(config.prefetch_queue_capacity);
        let metrics = CacheMetrics::new()?;

        info!(
            "Cache manager initialized: hot={} warm={} warm_ttl={}s remote={}",
            config.hot_cache_size,
            config.warm_cache_size,
            config.warm_cache_ttl_seconds,
            remote.name()
        );

        Ok(Self {
            generation: AtomicU64::new(0),
            hot: Mutex::new(LocalTier::hot(config.hot_cache_size)),
            warm: Mutex::new(LocalTier::warm(config.warm_cache_size, config.warm_ttl())),
            remote,
            stats: Mutex::new(StatsBook::new()),
            metrics,
            prefetch_tx,
            prefetch_rx: Mutex::new(Some(prefetch_rx)),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    // == Get ==
    /// Looks `key` up in the hot, warm and remote tiers, in that order.
    ///
    /// A warm hit is promoted into the hot tier, a remote hit into the warm tier.
    pub async fn get(&self, key: &str, namespace: &str) -> Option<CacheValue> {
        let full_key = build_key(key, namespace);
        let _timer = self.metrics.time("get", TierKind::All);
        let seen = self.generation.load(Ordering::SeqCst);

        let hot_hit = self.hot.lock().await.get(&full_key);
        if let Some(entry) = hot_hit {
            self.record_hit(TierKind::Hot, namespace).await;
            return Some(entry.value);
        }

        let warm_hit = self.warm.lock().await.get(&full_key);
        if let Some(entry) = warm_hit {
            self.record_hit(TierKind::Warm, namespace).await;
            let value = entry.value.clone();
            let mut hot = self.hot.lock().await;
            if self.unchanged_since(seen) {
                hot.set(entry);
                debug!(key = %full_key, "promoted warm entry to hot tier");
            }
            return Some(value);
        }

        if let Some(bytes) = self.remote.get(&full_key).await {
            match deserialize(&bytes) {
                Ok(value) => {
                    self.record_hit(TierKind::Remote, namespace).await;
                    let mut warm = self.warm.lock().await;
                    if self.unchanged_since(seen) {
                        warm.set(CacheEntry::new(full_key.as_str(), value.clone(), None));
                        debug!(key = %full_key, "promoted remote entry to warm tier");
                    } else {
                        debug!(key = %full_key, "write raced the lookup, skipping promotion");
                    }
                    return Some(value);
                }
                Err(e) => {
                    warn!(key = %full_key, error = %e, "undecodable remote entry, treating as miss");
                }
            }
        }

        self.record_miss(namespace).await;
        None
    }

    // == Set ==
    /// Writes `value` to the remote tier and, once that succeeds, mirrors it
    /// into the warm tier.
    ///
    /// Returns false without touching the local tiers when the remote write
    /// fails. A successful write invalidates any hot copy of the key, so the
    /// hot tier is only ever filled by promotion.
    pub async fn set(&self, key: &str, value: impl Into<CacheValue>, options: SetOptions) -> bool {
        let SetOptions {
            ttl,
            namespace,
            metadata,
        } = options;
        let ttl = ttl.filter(|t| *t > 0);
        let full_key = build_key(key, &namespace);
        let value = value.into();
        let _timer = self.metrics.time("set", TierKind::Remote);

        let serialized = serialize(&value);
        if !self.remote.set(&full_key, &serialized, ttl).await {
            warn!(key = %full_key, "remote write failed, not mirroring to warm tier");
            return false;
        }

        let local_size = value.approx_size();
        let entry = CacheEntry::new(full_key.as_str(), value, ttl)
            .with_metadata(metadata.unwrap_or_default());

        {
            let mut warm = self.warm.lock().await;
            self.bump_generation();
            self.hot.lock().await.delete(&full_key);
            warm.set(entry);
        }

        let (remote_bytes, warm_bytes) = {
            let mut stats = self.stats.lock().await;
            (
                stats.tier_mut(TierKind::Remote).record_write(serialized.len()),
                stats.tier_mut(TierKind::Warm).record_write(local_size),
            )
        };
        self.metrics.set_size(TierKind::Remote, remote_bytes);
        self.metrics.set_size(TierKind::Warm, warm_bytes);

        true
    }

    // == Delete ==
    /// Removes `key` from every tier. Returns whether the remote tier held it.
    pub async fn delete(&self, key: &str, namespace: &str) -> bool {
        let full_key = build_key(key, namespace);
        let _timer = self.metrics.time("delete", TierKind::All);

        let removed = self.remote.delete(&full_key).await;

        let mut warm = self.warm.lock().await;
        self.bump_generation();
        self.hot.lock().await.delete(&full_key);
        warm.delete(&full_key);
        removed
    }

    // == Clear ==
    /// Clears a namespace, a key pattern, or everything.
    ///
    /// A namespace takes precedence over a pattern. Local tiers cannot match
    /// patterns cheaply and are always flushed whole. Returns the number of
    /// keys the remote tier reported removed.
    pub async fn clear(&self, namespace: Option<&str>, pattern: Option<&str>) -> usize {
        let _timer = self.metrics.time("clear", TierKind::All);
        let pattern = namespace
            .map(namespace_pattern)
            .or_else(|| pattern.map(str::to_string));

        let removed = match &pattern {
            Some(pattern) => self.remote.delete_matching(pattern).await,
            None => self.remote.clear_all().await,
        };

        {
            let mut warm = self.warm.lock().await;
            self.bump_generation();
            self.hot.lock().await.clear();
            warm.clear();
        }

        info!(
            pattern = pattern.as_deref().unwrap_or("*"),
            removed, "cache cleared"
        );
        removed
    }

    // == Warmup ==
    /// Queues `(key, producer)` pairs for the prefetch loop.
    ///
    /// Never blocks: requests that do not fit in the queue are logged and
    /// dropped. Returns how many were queued.
    pub fn warmup<I, F, Fut>(&self, jobs: I, namespace: &str) -> usize
    where
        I: IntoIterator<Item = (String, F)>,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<CacheValue>> + Send + 'static,
    {
        let mut queued = 0;
        for (key, producer) in jobs {
            let job = PrefetchJob {
                key,
                namespace: namespace.to_string(),
                producer: Box::new(move || Box::pin(producer()) as BoxFuture<_>),
            };

            match self.prefetch_tx.try_send(job) {
                Ok(()) => queued += 1,
                Err(TrySendError::Full(job)) => {
                    warn!(key = %job.key, "prefetch queue full, dropping request");
                }
                Err(TrySendError::Closed(job)) => {
                    warn!(key = %job.key, "prefetch loop stopped, dropping request");
                }
            }
        }
        queued
    }

    // == Health Check ==
    /// True when the remote tier answers a ping and the hot tier survives a
    /// write/read round trip.
    pub async fn health_check(&self) -> bool {
        if !self.remote.ping().await {
            error!(remote = self.remote.name(), "Health check failed: remote tier unreachable");
            return false;
        }

        let probe = CacheValue::from("ok");
        let round_trip = self
            .hot
            .lock()
            .await
            .round_trip(CacheEntry::new(HEALTH_CHECK_KEY, probe.clone(), None));

        match round_trip {
            Some(entry) if entry.value == probe => true,
            _ => {
                error!("Health check failed: hot tier round trip mismatch");
                false
            }
        }
    }

    // == Stats ==
    /// Snapshot of the per-tier statistics, keyed by tier name.
    pub async fn get_stats(&self) -> BTreeMap<String, CacheStats> {
        self.stats.lock().await.snapshot()
    }

    /// Resets every counter wholesale.
    pub async fn reset_stats(&self) {
        self.stats.lock().await.reset();
    }

    /// Current number of entries held by the (hot, warm) tiers.
    pub async fn local_sizes(&self) -> (usize, usize) {
        let hot = self.hot.lock().await.size();
        let warm = self.warm.lock().await.size();
        (hot, warm)
    }

    // == Background Work ==
    /// Removes expired entries from both local tiers. Returns the count.
    pub async fn run_cleanup(&self) -> usize {
        let hot_removed = self.hot.lock().await.purge_expired();
        let warm_removed = self.warm.lock().await.purge_expired();
        self.stats.lock().await.mark_cleanup(Utc::now());
        hot_removed + warm_removed
    }

    /// Runs one prefetch job and stores its result. Producer failures and
    /// panics are logged and reported as `false`.
    pub async fn run_prefetch_job(&self, job: PrefetchJob) -> bool {
        let PrefetchJob {
            key,
            namespace,
            producer,
        } = job;

        match tokio::spawn(producer()).await {
            Ok(Ok(value)) => {
                let stored = self
                    .set(&key, value, SetOptions::new().namespace(namespace.as_str()))
                    .await;
                if !stored {
                    warn!(%key, %namespace, "prefetched value could not be stored");
                }
                stored
            }
            Ok(Err(e)) => {
                warn!(%key, %namespace, error = %e, "prefetch producer failed, dropping request");
                false
            }
            Err(e) => {
                warn!(%key, %namespace, error = %e, "prefetch producer panicked, dropping request");
                false
            }
        }
    }

    /// Persists the current statistics to the remote tier under
    /// [`STATS_SNAPSHOT_KEY`].
    pub async fn snapshot_stats(&self) -> bool {
        let snapshot = self.get_stats().await;
        match serde_json::to_vec(&snapshot) {
            Ok(bytes) => {
                self.remote
                    .set(STATS_SNAPSHOT_KEY, &bytes, Some(self.config.stats_ttl_secs))
                    .await
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize stats snapshot");
                false
            }
        }
    }

    /// Hands the prefetch queue receiver to the prefetch loop. Only the first
    /// caller gets it.
    pub(crate) async fn take_prefetch_receiver(&self) -> Option<mpsc::Receiver<PrefetchJob>> {
        self.prefetch_rx.lock().await.take()
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn unchanged_since(&self, seen: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == seen
    }

    async fn record_hit(&self, tier: TierKind, namespace: &str) {
        self.stats.lock().await.tier_mut(tier).record_hit();
        self.metrics.record_hit(tier, namespace);
        debug!(tier = tier.as_str(), namespace, "cache hit");
    }

    async fn record_miss(&self, namespace: &str) {
        self.stats.lock().await.tier_mut(TierKind::All).record_miss();
        self.metrics.record_miss(TierKind::All, namespace);
    }
}
