//! Cache Module
//!
//! Three-tier caching: a hot LRU tier, a warm TTL tier and a shared remote
//! tier, sequenced by [`CacheManager`].

mod entry;
mod key;
mod lru;
mod manager;
mod memoize;
mod metrics;
pub mod remote;
mod stats;
mod tier;
mod value;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, Metadata};
pub use key::{build_key, namespace_of, namespace_pattern, DEFAULT_NAMESPACE, KEY_SEPARATOR};
pub use lru::LruTracker;
pub use manager::{BoxFuture, CacheManager, PrefetchJob, PrefetchProducer, SetOptions};
pub use memoize::{default_call_key, CachedFn, KeyBuilder, MemoizeOptions};
pub use metrics::CacheMetrics;
pub use remote::{MemoryRemote, RedisRemote, RemoteStore};
pub use stats::{CacheStats, StatsBook, TierKind};
pub use tier::LocalTier;
pub use value::{deserialize, serialize, CacheValue};

// == Public Constants ==
/// Reserved remote key holding the periodic statistics snapshot
pub const STATS_SNAPSHOT_KEY: &str = "cache_stats";

/// Hot tier key used by the health check round trip
pub const HEALTH_CHECK_KEY: &str = "__health_check__";
