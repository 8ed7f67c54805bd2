//! Time-bounded read-through cache backed by moka.
//!
//! Entries expire after a fixed TTL and the cache never holds more than its
//! capacity. Invalidation drops every entry and bumps a generation counter;
//! a loader that read the store before an invalidation is not allowed to
//! write its (possibly stale) value back.

use std::hash::Hash;
use std::time::Duration;

use moka::sync::Cache;
use parking_lot::RwLock;

/// Default staleness window for cached reads
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
/// Default upper bound on cached read results
pub const DEFAULT_MAX_ENTRIES: u64 = 1_000;

/// Thread-safe TTL cache keyed by call signature
pub struct TtlCache<K, V> {
    /// `None` when the TTL is zero
    inner: Option<Cache<K, V>>,
    generation: RwLock<u64>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A zero TTL disables caching entirely
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: u64) -> Self {
        let inner = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build()
        });
        Self {
            inner,
            generation: RwLock::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.as_ref()?.get(key)
    }

    /// Current generation; capture it before loading from the store
    pub fn generation(&self) -> u64 {
        *self.generation.read()
    }

    /// Store `value` unless the cache was invalidated since `generation`.
    ///
    /// Returns whether the value was kept.
    pub fn insert_if_current(&self, key: K, value: V, generation: u64) -> bool {
        let Some(cache) = self.inner.as_ref() else {
            return false;
        };
        // Held across the insert so an invalidation cannot slip in between
        let current = self.generation.read();
        if *current != generation {
            return false;
        }
        cache.insert(key, value);
        true
    }

    /// Drop every entry
    pub fn invalidate(&self) {
        let mut generation = self.generation.write();
        *generation += 1;
        if let Some(cache) = self.inner.as_ref() {
            cache.invalidate_all();
        }
    }

    /// Live entries after pending evictions have run
    pub fn len(&self) -> u64 {
        match self.inner.as_ref() {
            Some(cache) => {
                cache.run_pending_tasks();
                cache.entry_count()
            }
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
