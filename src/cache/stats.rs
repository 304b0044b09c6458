//! Cache Statistics Module
//!
//! Per-tier counters: hits, misses, accumulated size and item writes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Tier Kind ==
/// The tiers statistics are kept for. `All` collects aggregate misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TierKind {
    Hot,
    Warm,
    Remote,
    All,
}

impl TierKind {
    pub const ALL_KINDS: [TierKind; 4] = [TierKind::Hot, TierKind::Warm, TierKind::Remote, TierKind::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Hot => "hot",
            TierKind::Warm => "warm",
            TierKind::Remote => "remote",
            TierKind::All => "all",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Stats ==
/// Counters for a single tier. Only ever incremented or reset wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of successful lookups served by this tier
    pub hits: u64,
    /// Number of lookups that missed
    pub misses: u64,
    /// Accumulated bytes written into this tier
    pub size_bytes: u64,
    /// Number of writes into this tier
    pub items: u64,
    pub created_at: DateTime<Utc>,
    /// Last time the cleanup loop swept the tiers
    pub last_cleanup: Option<DateTime<Utc>>,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            hits: 0,
            misses: 0,
            size_bytes: 0,
            items: 0,
            created_at: Utc::now(),
            last_cleanup: None,
        }
    }
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Accounts for one write of `bytes` into the tier; returns the new total.
    pub fn record_write(&mut self, bytes: usize) -> u64 {
        self.items += 1;
        self.size_bytes += bytes as u64;
        self.size_bytes
    }
}

// == Stats Book ==
/// The full set of per-tier statistics owned by a cache manager.
#[derive(Debug, Clone)]
pub struct StatsBook {
    tiers: BTreeMap<TierKind, CacheStats>,
}

impl Default for StatsBook {
    fn default() -> Self {
        Self {
            tiers: TierKind::ALL_KINDS
                .iter()
                .map(|kind| (*kind, CacheStats::new()))
                .collect(),
        }
    }
}

impl StatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier_mut(&mut self, kind: TierKind) -> &mut CacheStats {
        self.tiers.entry(kind).or_default()
    }

    pub fn tier(&self, kind: TierKind) -> Option<&CacheStats> {
        self.tiers.get(&kind)
    }

    /// Stamps every tier with the time of the latest cleanup sweep.
    pub fn mark_cleanup(&mut self, at: DateTime<Utc>) {
        for stats in self.tiers.values_mut() {
            stats.last_cleanup = Some(at);
        }
    }

    /// Snapshot keyed by tier name.
    pub fn snapshot(&self) -> BTreeMap<String, CacheStats> {
        self.tiers
            .iter()
            .map(|(kind, stats)| (kind.as_str().to_string(), stats.clone()))
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size_bytes, 0);
        assert_eq!(stats.items, 0);
        assert!(stats.last_cleanup.is_none());
    }

    #[test]
    fn test_hit_rate() {
        let mut stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_write_accumulates() {
        let mut stats = CacheStats::new();
        assert_eq!(stats.record_write(10), 10);
        assert_eq!(stats.record_write(5), 15);
        assert_eq!(stats.items, 2);
    }

    #[test]
    fn test_book_has_every_tier() {
        let book = StatsBook::new();
        let snapshot = book.snapshot();
        let names: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["all", "hot", "remote", "warm"]);
    }

    #[test]
    fn test_book_mark_cleanup_and_reset() {
        let mut book = StatsBook::new();
        book.tier_mut(TierKind::Hot).record_hit();
        book.mark_cleanup(Utc::now());

        assert!(book.tier(TierKind::Warm).unwrap().last_cleanup.is_some());
        assert_eq!(book.tier(TierKind::Hot).unwrap().hits, 1);

        book.reset();
        assert_eq!(book.tier(TierKind::Hot).unwrap().hits, 0);
        assert!(book.tier(TierKind::Warm).unwrap().last_cleanup.is_none());
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CacheStats::new();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["hits"], 0);
        assert!(json["last_cleanup"].is_null());
    }
}
