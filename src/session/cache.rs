//! Read-through TTL cache for session snapshots.
//!
//! Entries older than the TTL stop being served on the fast path but are
//! retained as last-known-good values for the degraded path, so a backend
//! outage downgrades the dashboard instead of blanking it.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct CachedValue<V> {
    stored_at: Instant,
    value: V,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    map: DashMap<K, CachedValue<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            map: DashMap::new(),
        }
    }

    pub fn put(&self, key: K, value: V) {
        self.map.insert(
            key,
            CachedValue {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    /// Value stored within the TTL window, if any.
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        self.map
            .get(key)
            .filter(|e| e.stored_at.elapsed() <= self.ttl)
            .map(|e| e.value.clone())
    }

    /// Last stored value regardless of age, with its age attached.
    pub fn last_known(&self, key: &K) -> Option<(V, Duration)> {
        self.map
            .get(key)
            .map(|e| (e.value.clone(), e.stored_at.elapsed()))
    }

    pub fn invalidate(&self, key: &K) {
        self.map.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_served() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put(1i64, "snapshot");
        assert_eq!(cache.get_fresh(&1), Some("snapshot"));
    }

    #[test]
    fn expired_entries_leave_the_fast_path_but_not_last_known() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.put(1i64, "snapshot");
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get_fresh(&1), None);
        let (value, age) = cache.last_known(&1).expect("still retained");
        assert_eq!(value, "snapshot");
        assert!(age >= Duration::from_millis(5));
    }

    #[test]
    fn invalidate_removes_everything() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put(1i64, "snapshot");
        cache.invalidate(&1);
        assert_eq!(cache.get_fresh(&1), None);
        assert!(cache.last_known(&1).is_none());
    }
}
