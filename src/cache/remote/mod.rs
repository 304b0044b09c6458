//! Remote Tier
//!
//! Adapter over a shared, out-of-process cache store. Implementations catch
//! every transport failure themselves: callers only ever see absent values,
//! `false` or `0`, never errors.

mod memory;
mod redis_store;

use async_trait::async_trait;

pub use memory::{glob_match, MemoryRemote};
pub use redis_store::RedisRemote;

/// Contract of the shared cache store behind the hot and warm tiers.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads the raw bytes stored under `key`.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Writes `value`, expiring after `ttl_secs` when given. Returns false if
    /// the store is unavailable or rejected the write.
    async fn set(&self, key: &str, value: &[u8], ttl_secs: Option<u64>) -> bool;

    /// Returns true if the key existed and was removed.
    async fn delete(&self, key: &str) -> bool;

    /// Removes every key matching the glob `pattern`, returning the count.
    async fn delete_matching(&self, pattern: &str) -> usize;

    /// Removes every key, returning the count.
    async fn clear_all(&self) -> usize;

    /// Liveness probe.
    async fn ping(&self) -> bool;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
