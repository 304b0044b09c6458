//! Local Tier Module
//!
//! Bounded in-process map used for both the hot (LRU only) and the warm
//! (LRU + uniform TTL) tiers.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, LruTracker};

/// An entry plus the deadline imposed by the tier itself.
#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    tier_deadline: Option<u64>,
}

impl Slot {
    fn is_expired_at(&self, now_ms: u64) -> bool {
        self.entry.is_expired_at(now_ms)
            || matches!(self.tier_deadline, Some(deadline) if now_ms >= deadline)
    }

    fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }
}

// == Local Tier ==
/// A bounded, recency-ordered map of cache entries.
///
/// Entries past their own `expires_at` or the tier TTL are never returned;
/// they are dropped lazily on access and in bulk by
/// [`LocalTier::purge_expired`]. The tier TTL is not written into the entry,
/// so a promoted entry only carries the caller's expiry.
#[derive(Debug)]
pub struct LocalTier {
    name: &'static str,
    entries: HashMap<String, Slot>,
    lru: LruTracker,
    capacity: usize,
    /// Uniform TTL applied at insertion, None for the hot tier
    ttl: Option<Duration>,
}

impl LocalTier {
    // == Constructor ==
    /// Creates a tier holding at most `capacity` entries.
    pub fn new(name: &'static str, capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            name,
            entries: HashMap::with_capacity(capacity.min(1024)),
            lru: LruTracker::new(),
            capacity,
            ttl,
        }
    }

    /// Hot tier: recency bounded, no tier TTL.
    pub fn hot(capacity: usize) -> Self {
        Self::new("hot", capacity, None)
    }

    /// Warm tier: recency and time bounded.
    pub fn warm(capacity: usize, ttl: Duration) -> Self {
        Self::new("warm", capacity, Some(ttl))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Get ==
    /// Returns a copy of the live entry for `key` and marks it as recently used.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.remove_entry(key);
            debug!(tier = self.name, key, "dropped expired entry on read");
            return None;
        }

        self.lru.touch(key);
        self.entries.get(key).map(|slot| slot.entry.clone())
    }

    // == Set ==
    /// Inserts or replaces an entry under its own key.
    ///
    /// At capacity, expired entries are purged first; if the tier is still
    /// full the least recently used entry is evicted.
    pub fn set(&mut self, entry: CacheEntry) {
        let tier_deadline = self
            .ttl
            .map(|ttl| deadline_after(ttl));

        let key = entry.key.clone();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.purge_expired();
            while self.entries.len() >= self.capacity {
                match self.lru.evict_oldest() {
                    Some(evicted) => {
                        self.entries.remove(&evicted);
                        debug!(tier = self.name, key = %evicted, "evicted least recently used entry");
                    }
                    None => break,
                }
            }
        }

        self.entries.insert(
            key.clone(),
            Slot {
                entry,
                tier_deadline,
            },
        );
        self.lru.touch(&key);
    }

    // == Round Trip ==
    /// Writes `entry`, reads it back and removes it again, without evicting
    /// anything to make room. Returns what was read.
    pub fn round_trip(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        let key = entry.key.clone();
        let displaced = self.remove_entry(&key);

        self.entries.insert(
            key.clone(),
            Slot {
                entry,
                tier_deadline: None,
            },
        );
        self.lru.touch(&key);
        let read = self.get(&key);
        self.remove_entry(&key);

        if let Some(slot) = displaced {
            self.entries.insert(key.clone(), slot);
            self.lru.touch(&key);
        }
        read
    }

    // == Delete ==
    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    /// True if a live (non-expired) entry exists. Does not affect recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|slot| !slot.is_expired())
            .unwrap_or(false)
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Purge Expired ==
    /// Removes every expired entry and returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }
        expired.len()
    }

    fn remove_entry(&mut self, key: &str) -> Option<Slot> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.lru.remove(key);
        }
        removed
    }
}

fn deadline_after(ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    current_timestamp_ms().saturating_add(ttl_ms)
}
