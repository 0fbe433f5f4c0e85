//! # Series Cache
//!
//! LRU cache of decoded series so repeated reads of the same instance
//! skip the file decode.
//!
//! ## Design
//!
//! - Entries live in a `BTreeMap` for deterministic eviction order
//! - Recency uses a logical clock (monotonic counter), not wall time
//! - Eviction removes a batch of the least recently used entries
//! - Writers invalidate the entry of the instance they touched

use crate::series::TimeSeries;
use std::collections::BTreeMap;
use uuid::Uuid;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Default number of cached series.
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// Default number of entries evicted when the cache is full.
pub const DEFAULT_EVICTION_BATCH: usize = 8;

// =============================================================================
// LRU CACHE
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    last_access: u64,
}

/// Least-recently-used cache with a logical clock.
#[derive(Debug)]
pub struct LruCache<K: Ord + Clone, V: Clone> {
    entries: BTreeMap<K, CacheEntry<V>>,
    max_size: usize,
    eviction_batch: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl<K: Ord + Clone, V: Clone> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl<K: Ord + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `max_size` entries (at least one).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_size: max_size.max(1),
            eviction_batch: DEFAULT_EVICTION_BATCH,
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Set how many entries one eviction removes.
    #[must_use]
    pub fn with_eviction_batch(mut self, batch_size: usize) -> Self {
        self.eviction_batch = batch_size.max(1);
        self
    }

    /// Cloned value for `key`, refreshing its recency.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.clock = self.clock.saturating_add(1);
        let now = self.clock;

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = now;
                self.hits = self.hits.saturating_add(1);
                Some(entry.value.clone())
            }
            None => {
                self.misses = self.misses.saturating_add(1);
                None
            }
        }
    }

    /// Insert or replace, evicting first when full.
    pub fn insert(&mut self, key: K, value: V) {
        self.clock = self.clock.saturating_add(1);
        let now = self.clock;

        if self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
            self.evict();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: now,
            },
        );
    }

    /// Drop `key`. Returns whether it was cached.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let total = self.hits.saturating_add(self.misses);
        let hit_rate_percent = if total == 0 {
            0
        } else {
            (self.hits.saturating_mul(100) / total) as u8
        };
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
            hit_rate_percent,
        }
    }

    fn evict(&mut self) {
        let to_evict = self.eviction_batch.min(self.entries.len());

        // Oldest access first; ties broken by key order.
        let mut by_access: Vec<(u64, K)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_access, key.clone()))
            .collect();
        by_access.sort_by_key(|(access, _)| *access);

        for (_, key) in by_access.into_iter().take(to_evict) {
            self.entries.remove(&key);
        }
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Integer percentage, 0-100.
    pub hit_rate_percent: u8,
}

/// Decoded series keyed by instance uuid.
pub type SeriesCache = LruCache<Uuid, TimeSeries>;

// =============================================================================
// TESTS
// =============================================================================
