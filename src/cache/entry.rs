//! Cache Entry Module
//!
//! Defines the unit stored in the local tiers, with optional expiry and
//! free-form metadata.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheValue;

/// Free-form metadata attached by the caller of `set`.
pub type Metadata = HashMap<String, Value>;

// == Cache Entry ==
/// A cached value together with its bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    /// Composed `namespace:key`
    pub key: String,
    /// The stored value
    pub value: CacheValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Caller supplied metadata
    pub metadata: Metadata,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry, expiring `ttl_seconds` from now when given.
    pub fn new(key: impl Into<String>, value: CacheValue, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        Self {
            key: key.into(),
            value,
            created_at: now,
            expires_at: ttl_seconds.map(|ttl| now.saturating_add(ttl.saturating_mul(1000))),
            metadata: Metadata::new(),
        }
    }

    /// Attaches caller metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms >= expires)
    }

    // == Time To Live ==
    /// Remaining TTL in milliseconds, `Some(0)` once expired, None without expiry.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("default:k", CacheValue::from("v"), None);

        assert_eq!(entry.key, "default:k");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining_ms().is_none());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("default:k", CacheValue::from("v"), Some(1));
        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), Some(0));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            key: "k".to_string(),
            value: CacheValue::from(1),
            created_at: now,
            expires_at: Some(now),
            metadata: Metadata::new(),
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - 1));
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_wrapping() {
        let entry = CacheEntry::new("k", CacheValue::from("v"), Some(u64::MAX / 100));
        assert_eq!(entry.expires_at, Some(u64::MAX));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_with_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("prefetch"));

        let entry = CacheEntry::new("k", CacheValue::from("v"), None).with_metadata(metadata);
        assert_eq!(entry.metadata["source"], json!("prefetch"));
    }
}
