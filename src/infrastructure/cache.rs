use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

pub struct Cache<K, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V> Cache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Cache {
            inner: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

/// LRU cache whose entries also expire a fixed time after their last write.
pub struct ExpiringCache<K, V> {
    inner: Cache<K, (V, Instant)>,
    ttl: Duration,
}

impl<K: Hash + Eq + Clone, V> ExpiringCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Cache::new(capacity),
            ttl,
        }
    }

    /// Insert or refresh `key`, restarting its expiry clock.
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.inner.insert(key, (value, now + self.ttl));
    }

    /// Drop expired entries and return how many remain.
    pub fn live_count(&mut self) -> usize {
        self.live_count_at(Instant::now())
    }

    pub fn live_count_at(&mut self, now: Instant) -> usize {
        let expired: Vec<K> = self
            .inner
            .inner
            .iter()
            .filter(|(_, (_, expires_at))| *expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.inner.remove(key);
        }
        self.inner.len()
    }
}
