//! Time-boxed reuse of fetched snapshots.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Keyed snapshot store.
pub trait SnapshotCache<V>: Send + Sync {
    /// Fresh entry for `key`, if any.
    fn get(&self, key: &str) -> Option<Arc<V>>;

    fn insert(&self, key: &str, value: Arc<V>);

    /// Drop the entry for `key` so the next load refetches.
    fn invalidate(&self, key: &str);
}

struct CachedEntry<V> {
    value: Arc<V>,
    cached_at: Instant,
}

/// DashMap-backed cache whose entries expire after a fixed TTL.
pub struct TtlCache<V> {
    entries: DashMap<String, CachedEntry<V>>,
    ttl: Duration,
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear expired entries.
    pub fn purge_expired(&self) {
        self.entries
            .retain(|_, entry| entry.cached_at.elapsed() < self.ttl);
    }
}

impl<V: Send + Sync> SnapshotCache<V> for TtlCache<V> {
    fn get(&self, key: &str) -> Option<Arc<V>> {
        let entry = self.entries.get(key)?;
        let age = entry.cached_at.elapsed();
        if age < self.ttl {
            debug!(key, age_secs = age.as_secs(), "Snapshot cache hit");
            Some(Arc::clone(&entry.value))
        } else {
            debug!(key, age_secs = age.as_secs(), "Snapshot cache entry expired");
            None
        }
    }

    fn insert(&self, key: &str, value: Arc<V>) {
        self.entries.insert(
            key.to_string(),
            CachedEntry {
                value,
                cached_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Cache that never holds anything; every load refetches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl<V> SnapshotCache<V> for NoCache {
    fn get(&self, _key: &str) -> Option<Arc<V>> {
        None
    }

    fn insert(&self, _key: &str, _value: Arc<V>) {}

    fn invalidate(&self, _key: &str) {}
}
