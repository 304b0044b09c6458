//! Response DTOs for the cache HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheStats, CacheValue};

/// Response body for `GET /get/:namespace/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub namespace: String,
    pub key: String,
    pub value: CacheValue,
}

impl GetResponse {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, value: CacheValue) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /set`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub namespace: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully in '{}'", key, namespace),
            namespace,
            key,
        }
    }
}

/// Response body for `DELETE /del/:namespace/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub namespace: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted from '{}'", key, namespace),
            namespace,
            key,
        }
    }
}

/// Response body for `POST /clear`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Keys the remote tier reported removed
    pub removed: usize,
}

/// Per-tier figures in the stats response
#[derive(Debug, Clone, Serialize)]
pub struct TierStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub size_bytes: u64,
    pub items: u64,
    /// hits / (hits + misses), 0 without traffic
    pub hit_rate: f64,
    pub created_at: DateTime<Utc>,
    pub last_cleanup: Option<DateTime<Utc>>,
}

impl From<&CacheStats> for TierStatsResponse {
    fn from(stats: &CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            size_bytes: stats.size_bytes,
            items: stats.items,
            hit_rate: stats.hit_rate(),
            created_at: stats.created_at,
            last_cleanup: stats.last_cleanup,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Keyed by tier name: hot, warm, remote, all
    pub tiers: BTreeMap<String, TierStatsResponse>,
    /// Entries currently held by the hot tier
    pub hot_entries: usize,
    /// Entries currently held by the warm tier
    pub warm_entries: usize,
}

impl StatsResponse {
    pub fn new(stats: &BTreeMap<String, CacheStats>, hot_entries: usize, warm_entries: usize) -> Self {
        Self {
            tiers: stats
                .iter()
                .map(|(tier, s)| (tier.clone(), TierStatsResponse::from(s)))
                .collect(),
            hot_entries,
            warm_entries,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// Name of the remote backend in use
    pub remote: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(healthy: bool, remote: impl Into<String>) -> Self {
        Self {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            remote: remote.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
