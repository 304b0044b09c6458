//! Request DTOs for the cache HTTP surface
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::{CacheValue, Metadata, SetOptions, DEFAULT_NAMESPACE, KEY_SEPARATOR};

/// Longest accepted raw key or namespace
const MAX_KEY_LEN: usize = 256;

/// Request body for `PUT /set`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    /// Any JSON value
    pub value: CacheValue,
    /// Optional TTL in seconds; 0 or absent stores without expiry
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LEN {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LEN
            ));
        }
        if let Some(namespace) = &self.namespace {
            if namespace.is_empty() || namespace.contains(KEY_SEPARATOR) {
                return Some(format!(
                    "Namespace must be non-empty and must not contain '{}'",
                    KEY_SEPARATOR
                ));
            }
        }
        None
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Splits the request into the key, value and options for `CacheManager::set`.
    pub fn into_parts(self) -> (String, CacheValue, SetOptions) {
        let mut options = SetOptions::new().namespace(self.namespace().to_string());
        options.ttl = self.ttl;
        options.metadata = self.metadata;
        (self.key, self.value, options)
    }
}

/// Request body for `POST /clear`. An empty body clears everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub namespace: Option<String>,
    /// Redis glob pattern, ignored when `namespace` is set
    #[serde(default)]
    pub pattern: Option<String>,
}
