//! Redis remote tier
//!
//! Talks to any Redis-compatible server over a multiplexed tokio connection.
//! Each call is bounded by the configured timeout; failures and timeouts are
//! logged and mapped to the absent/false/0 results of [`RemoteStore`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisResult;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::RemoteStore;
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Redis Remote ==
pub struct RedisRemote {
    client: redis::Client,
    /// Cached connection, dropped after any failure so the next call reconnects
    connection: Mutex<Option<MultiplexedConnection>>,
    timeout: Duration,
}

impl RedisRemote {
    /// Creates the client. No connection is opened until the first call.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::InvalidConfig(format!("invalid remote url '{}': {}", url, e)))?;

        info!("Redis remote tier configured for {}", url);
        Ok(Self {
            client,
            connection: Mutex::new(None),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.remote_url(), config.remote_timeout())
    }

    async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        debug!("Redis connection established");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset_connection(&self) {
        self.connection.lock().await.take();
    }

    /// Runs one remote operation under the timeout, swallowing every failure.
    async fn run<T, F, Fut>(&self, op: &'static str, call: F) -> Option<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let attempt = async {
            let conn = self.connection().await?;
            call(conn).await
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "Redis call failed");
                self.reset_connection().await;
                None
            }
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Redis call timed out");
                self.reset_connection().await;
                None
            }
        }
    }
}

#[async_trait]
impl RemoteStore for RedisRemote {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.run("get", |mut conn| async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<Option<Vec<u8>>>(&mut conn)
                .await
        })
        .await
        .flatten()
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: Option<u64>) -> bool {
        self.run("set", |mut conn| async move {
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value);
            if let Some(ttl) = ttl_secs {
                cmd.arg("EX").arg(ttl);
            }
            cmd.query_async::<()>(&mut conn).await
        })
        .await
        .is_some()
    }

    async fn delete(&self, key: &str) -> bool {
        self.run("delete", |mut conn| async move {
            redis::cmd("DEL").arg(key).query_async::<i64>(&mut conn).await
        })
        .await
        .map_or(false, |removed| removed > 0)
    }

    async fn delete_matching(&self, pattern: &str) -> usize {
        self.run("delete_matching", |mut conn| async move {
            let keys: Vec<String> = redis::cmd("KEYS")
                .arg(pattern)
                .query_async(&mut conn)
                .await?;
            if keys.is_empty() {
                return Ok(0);
            }
            redis::cmd("DEL").arg(&keys).query_async::<usize>(&mut conn).await
        })
        .await
        .unwrap_or(0)
    }

    async fn clear_all(&self) -> usize {
        self.run("clear_all", |mut conn| async move {
            let size: usize = redis::cmd("DBSIZE").query_async(&mut conn).await?;
            redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await?;
            Ok::<usize, redis::RedisError>(size)
        })
        .await
        .unwrap_or(0)
    }

    async fn ping(&self) -> bool {
        self.run("ping", |mut conn| async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await
        })
        .await
        .map_or(false, |reply| reply == "PONG")
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = RedisRemote::new("not a url", Duration::from_millis(100));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_degrades() {
        // Nothing listens on port 1; every call must come back as a miss
        let remote = RedisRemote::new("redis://127.0.0.1:1/0", Duration::from_millis(200)).unwrap();

        assert!(!remote.ping().await);
        assert_eq!(remote.get("default:k").await, None);
        assert!(!remote.set("default:k", b"v", Some(10)).await);
        assert!(!remote.delete("default:k").await);
        assert_eq!(remote.delete_matching("default:*").await, 0);
        assert_eq!(remote.clear_all().await, 0);
    }
}
