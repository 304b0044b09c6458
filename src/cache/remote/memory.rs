//! In-process remote tier
//!
//! Behaves like a Redis-compatible store (TTL, glob matching) without a
//! network hop. Availability can be switched off to simulate an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::RemoteStore;
use crate::cache::entry::current_timestamp_ms;

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Option<u64>,
}

impl StoredValue {
    fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at.map_or(true, |expires| now_ms < expires)
    }
}

// == Memory Remote ==
#[derive(Debug)]
pub struct MemoryRemote {
    entries: Mutex<HashMap<String, StoredValue>>,
    available: AtomicBool,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the simulated store on or off.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = current_timestamp_ms();
        let entries = self.entries.lock().await;
        entries.values().filter(|v| v.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self, op: &str) -> bool {
        let available = self.is_available();
        if !available {
            warn!(op, "memory remote unavailable");
        }
        available
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.check_available("get") {
            return None;
        }

        let now = current_timestamp_ms();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(stored) if stored.is_live(now) => Some(stored.bytes.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: Option<u64>) -> bool {
        if !self.check_available("set") {
            return false;
        }

        let expires_at =
            ttl_secs.map(|ttl| current_timestamp_ms().saturating_add(ttl.saturating_mul(1000)));
        self.entries.lock().await.insert(
            key.to_string(),
            StoredValue {
                bytes: value.to_vec(),
                expires_at,
            },
        );
        true
    }

    async fn delete(&self, key: &str) -> bool {
        if !self.check_available("delete") {
            return false;
        }

        let now = current_timestamp_ms();
        self.entries
            .lock()
            .await
            .remove(key)
            .map_or(false, |stored| stored.is_live(now))
    }

    async fn delete_matching(&self, pattern: &str) -> usize {
        if !self.check_available("delete_matching") {
            return 0;
        }

        let now = current_timestamp_ms();
        let mut entries = self.entries.lock().await;
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, stored)| stored.is_live(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matching {
            entries.remove(key);
        }
        debug!(pattern, removed = matching.len(), "memory remote pattern delete");
        matching.len()
    }

    async fn clear_all(&self) -> usize {
        if !self.check_available("clear_all") {
            return 0;
        }

        let now = current_timestamp_ms();
        let mut entries = self.entries.lock().await;
        let live = entries.values().filter(|v| v.is_live(now)).count();
        entries.clear();
        live
    }

    async fn ping(&self) -> bool {
        self.is_available()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// == Glob Matching ==
/// Redis `KEYS`-style glob matching: `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and
/// `\` escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_from(&pattern, &text)
}

fn glob_match_from(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Resume point for the most recent `*`: (pattern index after it, text index)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match_class(pattern, p, text[t]),
            Some('\\') if p + 1 < pattern.len() => {
                (pattern[p + 1] == text[t]).then_some(p + 2)
            }
            Some(c) => (*c == text[t]).then_some(p + 1),
            None => None,
        };

        match (step, backtrack) {
            (Some(next), _) => {
                p = next;
                t += 1;
            }
            (None, Some((star_p, star_t))) => {
                p = star_p;
                t = star_t + 1;
                backtrack = Some((star_p, star_t + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Matches `c` against the class starting at `pattern[start] == '['`.
/// Returns the pattern index after the class on success.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<usize> {
    let mut i = start + 1;
    let negated = matches!(pattern.get(i), Some('^'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    // Unterminated class: treat `[` as a literal
    if i >= pattern.len() {
        return (c == '[').then_some(start + 1);
    }

    (matched != negated).then_some(i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("users:*", "users:1"));
        assert!(glob_match("users:*", "users:"));
        assert!(!glob_match("users:*", "other:1"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("h?llo", "hello"));
        assert!(!glob_match("h?llo", "hllo"));
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("h[a-c]llo", "hbllo"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match(r"literal\*", "literal*"));
        assert!(!glob_match(r"literal\*", "literalx"));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let remote = MemoryRemote::new();
        assert!(remote.set("default:k", b"v", None).await);
        assert_eq!(remote.get("default:k").await, Some(b"v".to_vec()));
        assert!(remote.delete("default:k").await);
        assert!(!remote.delete("default:k").await);
        assert_eq!(remote.get("default:k").await, None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let remote = MemoryRemote::new();
        remote.set("k", b"v", Some(1)).await;
        assert!(remote.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(remote.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_huge_ttl_is_stored_live() {
        let remote = MemoryRemote::new();
        assert!(remote.set("k", b"v", Some(u64::MAX / 100)).await);
        assert_eq!(remote.get("k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_matching_and_clear_all() {
        let remote = MemoryRemote::new();
        remote.set("users:1", b"a", None).await;
        remote.set("users:2", b"b", None).await;
        remote.set("other:1", b"c", None).await;

        assert_eq!(remote.delete_matching("users:*").await, 2);
        assert_eq!(remote.len().await, 1);
        assert_eq!(remote.clear_all().await, 1);
        assert_eq!(remote.clear_all().await, 0);
        assert!(remote.is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades() {
        let remote = MemoryRemote::new();
        remote.set("k", b"v", None).await;
        remote.set_available(false);

        assert!(!remote.ping().await);
        assert!(remote.get("k").await.is_none());
        assert!(!remote.set("k2", b"v", None).await);
        assert!(!remote.delete("k").await);
        assert_eq!(remote.delete_matching("*").await, 0);

        remote.set_available(true);
        assert_eq!(remote.get("k").await, Some(b"v".to_vec()));
    }

    #[test]
    fn test_blocking_usage() {
        let remote = MemoryRemote::new();
        tokio_test::block_on(async {
            assert!(remote.ping().await);
            assert!(remote.set("k", b"1", None).await);
        });
        assert_eq!(remote.name(), "memory");
    }
}
