//! Entry storage for a single region.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// A stored value and the moment it was written.
#[derive(Clone, Debug)]
struct Entry<V> {
    value: V,
    written_at: Instant,
}

impl<V> Entry<V> {
    /// Expiry counts from the write, so reads never extend an entry's life.
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match ttl {
            Some(ttl) => now.saturating_duration_since(self.written_at) >= ttl,
            None => false,
        }
    }
}

/// LRU-bounded map of entries with a shared time-to-live.
pub(crate) struct RegionStore<K, V> {
    entries: LruCache<K, Entry<V>>,
    ttl: Option<Duration>,
}

impl<K: Hash + Eq, V: Clone> RegionStore<K, V> {
    pub(crate) fn new(capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    /// Returns a fresh value for `key`, dropping it first if it has expired.
    pub(crate) fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = self.entries.get(key)?.is_expired(self.ttl, now);
        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`.
    ///
    /// Returns `true` when a different entry had to be evicted to make room.
    pub(crate) fn insert(&mut self, key: K, value: V, now: Instant) -> bool {
        let entry = Entry {
            value,
            written_at: now,
        };
        let replaced = self.entries.contains(&key);
        let pushed_out = self.entries.push(key, entry);
        !replaced && pushed_out.is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
