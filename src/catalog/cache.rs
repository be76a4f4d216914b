use std::collections::HashMap;
use std::hash::Hash;

use tokio::time::{Duration, Instant};

/// Cache with a freshness window: entries older than `ttl` are treated as
/// absent and replaced on the next fetch.
pub struct FreshCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> FreshCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Drops stale entries so the map doesn't grow with every title visited.
    pub fn purge_stale(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut cache = FreshCache::new(Duration::from_secs(60));
        cache.insert("m1", 1);
        assert_eq!(cache.get(&"m1"), Some(1));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&"m1"), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&"m1"), None);

        cache.purge_stale();
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_never_serves() {
        let mut cache = FreshCache::new(Duration::ZERO);
        cache.insert("m1", "x");
        assert_eq!(cache.get(&"m1"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_removes_only_that_key() {
        let mut cache = FreshCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);

        cache.invalidate(&"a");
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
