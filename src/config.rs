//! Configuration Module
//!
//! Handles loading and validating cache manager configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Which remote tier implementation the binary connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBackend {
    /// Redis-compatible server at `remote_host:remote_port`
    Redis,
    /// In-process store, useful for local runs without Redis
    Memory,
}

impl FromStr for RemoteBackend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown remote backend '{}'",
                other
            ))),
        }
    }
}

/// Cache manager configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote cache host
    pub remote_host: String,
    /// Remote cache port
    pub remote_port: u16,
    /// Remote database index
    pub remote_db_index: i64,
    /// Upper bound for a single remote call in milliseconds
    pub remote_timeout_ms: u64,
    /// Remote tier implementation
    pub remote_backend: RemoteBackend,
    /// Hot (LRU) tier capacity in entries
    pub hot_cache_size: usize,
    /// Warm (TTL) tier capacity in entries
    pub warm_cache_size: usize,
    /// Uniform TTL applied to every warm tier insertion
    pub warm_cache_ttl_seconds: u64,
    /// Cleanup loop interval in seconds
    pub cleanup_interval_secs: u64,
    /// Prefetch loop interval in milliseconds
    pub prefetch_interval_ms: u64,
    /// Stats snapshot loop interval in seconds
    pub stats_interval_secs: u64,
    /// TTL of the persisted stats snapshot in seconds
    pub stats_ttl_secs: u64,
    /// Bound of the prefetch queue
    pub prefetch_queue_capacity: usize,
    /// HTTP server port of the operations binary
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REMOTE_HOST` (default: localhost), `REMOTE_PORT` (6379), `REMOTE_DB_INDEX` (0)
    /// - `REMOTE_TIMEOUT_MS` (500), `REMOTE_BACKEND` (redis)
    /// - `HOT_CACHE_SIZE` (100), `WARM_CACHE_SIZE` (1000), `WARM_CACHE_TTL_SECONDS` (60)
    /// - `CLEANUP_INTERVAL` (60), `PREFETCH_INTERVAL_MS` (1000)
    /// - `STATS_INTERVAL` (60), `STATS_TTL` (3600), `PREFETCH_QUEUE_CAPACITY` (1024)
    /// - `SERVER_PORT` (3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            remote_host: env::var("REMOTE_HOST").unwrap_or(defaults.remote_host),
            remote_port: env_or("REMOTE_PORT", defaults.remote_port),
            remote_db_index: env_or("REMOTE_DB_INDEX", defaults.remote_db_index),
            remote_timeout_ms: env_or("REMOTE_TIMEOUT_MS", defaults.remote_timeout_ms),
            remote_backend: env_or("REMOTE_BACKEND", defaults.remote_backend),
            hot_cache_size: env_or("HOT_CACHE_SIZE", defaults.hot_cache_size),
            warm_cache_size: env_or("WARM_CACHE_SIZE", defaults.warm_cache_size),
            warm_cache_ttl_seconds: env_or("WARM_CACHE_TTL_SECONDS", defaults.warm_cache_ttl_seconds),
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval_secs),
            prefetch_interval_ms: env_or("PREFETCH_INTERVAL_MS", defaults.prefetch_interval_ms),
            stats_interval_secs: env_or("STATS_INTERVAL", defaults.stats_interval_secs),
            stats_ttl_secs: env_or("STATS_TTL", defaults.stats_ttl_secs),
            prefetch_queue_capacity: env_or(
                "PREFETCH_QUEUE_CAPACITY",
                defaults.prefetch_queue_capacity,
            ),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Rejects configurations the manager cannot run with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("hot_cache_size", self.hot_cache_size as u64),
            ("warm_cache_size", self.warm_cache_size as u64),
            ("warm_cache_ttl_seconds", self.warm_cache_ttl_seconds),
            ("remote_timeout_ms", self.remote_timeout_ms),
            ("cleanup_interval_secs", self.cleanup_interval_secs),
            ("prefetch_interval_ms", self.prefetch_interval_ms),
            ("stats_interval_secs", self.stats_interval_secs),
            ("prefetch_queue_capacity", self.prefetch_queue_capacity as u64),
        ];

        for (name, value) in checks {
            if value == 0 {
                return Err(CacheError::InvalidConfig(format!("{} must be > 0", name)));
            }
        }
        if self.remote_host.is_empty() {
            return Err(CacheError::InvalidConfig(
                "remote_host must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection URL for a Redis-compatible remote tier.
    pub fn remote_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.remote_host, self.remote_port, self.remote_db_index
        )
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn warm_ttl(&self) -> Duration {
        Duration::from_secs(self.warm_cache_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_host: "localhost".to_string(),
            remote_port: 6379,
            remote_db_index: 0,
            remote_timeout_ms: 500,
            remote_backend: RemoteBackend::Redis,
            hot_cache_size: 100,
            warm_cache_size: 1000,
            warm_cache_ttl_seconds: 60,
            cleanup_interval_secs: 60,
            prefetch_interval_ms: 1000,
            stats_interval_secs: 60,
            stats_ttl_secs: 3600,
            prefetch_queue_capacity: 1024,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.remote_host, "localhost");
        assert_eq!(config.remote_port, 6379);
        assert_eq!(config.remote_db_index, 0);
        assert_eq!(config.hot_cache_size, 100);
        assert_eq!(config.warm_cache_size, 1000);
        assert_eq!(config.warm_cache_ttl_seconds, 60);
        assert_eq!(config.cleanup_interval_secs, 60);
        assert_eq!(config.prefetch_interval_ms, 1000);
        assert_eq!(config.stats_ttl_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("HOT_CACHE_SIZE");
        env::remove_var("WARM_CACHE_SIZE");
        env::remove_var("REMOTE_PORT");
        env::remove_var("REMOTE_BACKEND");

        let config = Config::from_env();
        assert_eq!(config.hot_cache_size, 100);
        assert_eq!(config.warm_cache_size, 1000);
        assert_eq!(config.remote_port, 6379);
        assert_eq!(config.remote_backend, RemoteBackend::Redis);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = Config {
            hot_cache_size: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(msg)) if msg.contains("hot_cache_size")
        ));
    }

    #[test]
    fn test_remote_url() {
        let config = Config {
            remote_host: "cache.internal".to_string(),
            remote_port: 6380,
            remote_db_index: 2,
            ..Config::default()
        };
        assert_eq!(config.remote_url(), "redis://cache.internal:6380/2");
    }

    #[test]
    fn test_remote_backend_parse() {
        assert_eq!("memory".parse::<RemoteBackend>().unwrap(), RemoteBackend::Memory);
        assert_eq!("REDIS".parse::<RemoteBackend>().unwrap(), RemoteBackend::Redis);
        assert!("memcached".parse::<RemoteBackend>().is_err());
    }
}
