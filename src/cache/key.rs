//! Cache Key Module
//!
//! Deterministic `namespace:key` composition shared by every tier.

/// Namespace used when the caller does not supply one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Separator between namespace and raw key.
pub const KEY_SEPARATOR: char = ':';

/// Composes the full cache key for `raw_key` inside `namespace`.
pub fn build_key(raw_key: &str, namespace: &str) -> String {
    let mut key = String::with_capacity(namespace.len() + raw_key.len() + 1);
    key.push_str(namespace);
    key.push(KEY_SEPARATOR);
    key.push_str(raw_key);
    key
}

/// Glob pattern that matches every key of `namespace` on the remote tier.
/// Glob metacharacters in the namespace are escaped and match literally.
pub fn namespace_pattern(namespace: &str) -> String {
    let mut pattern = String::with_capacity(namespace.len() + 2);
    for c in namespace.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push(KEY_SEPARATOR);
    pattern.push('*');
    pattern
}

/// Returns the namespace part of a composed key, if any.
pub fn namespace_of(full_key: &str) -> Option<&str> {
    full_key.split_once(KEY_SEPARATOR).map(|(ns, _)| ns)
}
