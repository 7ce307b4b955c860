//! Keyed in-memory TTL cache.
//!
//! Used to memoize successful drug-info lookups per medication name so a
//! burst of `external-info` requests does not re-hit OpenFDA within the
//! TTL. Failures are never cached; callers only insert successes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// TTL cache mapping string keys to clonable values.
pub struct KeyedTtlCache<T: Clone> {
    entries: HashMap<String, (T, Instant)>,
    ttl: Duration,
}

impl<T: Clone> KeyedTtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns the cached value only when still within TTL.
    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key).and_then(|(value, cached_at)| {
            if cached_at.elapsed() <= self.ttl {
                Some(value.clone())
            } else {
                None
            }
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        // Drop expired entries so the map stays bounded by the working set.
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, cached_at)| cached_at.elapsed() <= ttl);
        self.entries.insert(key.into(), (value, Instant::now()));
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_fresh_value() {
        let mut cache = KeyedTtlCache::new(Duration::from_secs(60));
        cache.insert("Aspirin", 42u32);
        assert_eq!(cache.get("Aspirin"), Some(42));
        assert_eq!(cache.get("Ibuprofen"), None);
    }

    #[test]
    fn get_returns_none_after_ttl() {
        let mut cache = KeyedTtlCache::new(Duration::from_millis(0));
        cache.insert("Aspirin", 42u32);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("Aspirin"), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = KeyedTtlCache::new(Duration::from_secs(60));
        cache.insert("Aspirin", 42u32);
        cache.invalidate("Aspirin");
        assert_eq!(cache.get("Aspirin"), None);
    }
}
