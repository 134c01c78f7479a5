// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Bounded cache of computed metadata items

use crate::id::MetadataId;
use crate::service::MetadataItem;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of items kept before the least recently used is dropped
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Items stored
    pub puts: u64,
    /// Items removed by explicit eviction
    pub evictions: u64,
    /// Items currently held
    pub len: usize,
    /// Maximum items held
    pub capacity: usize,
}

struct Inner {
    items: LruCache<MetadataId, Arc<dyn MetadataItem>>,
    stats: CacheStats,
}

/// LRU store of metadata items keyed by identifier
pub struct MetadataCache {
    inner: Mutex<Inner>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MetadataCache {
    /// Create a cache holding at most `capacity` items (minimum one)
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                items: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Look up an item, recording a hit or miss
    pub fn get(&self, id: &MetadataId) -> Option<Arc<dyn MetadataItem>> {
        let mut inner = self.inner.lock();
        let found = inner.items.get(id).cloned();
        if found.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        found
    }

    /// Whether an item is held, without touching recency or counters
    #[must_use]
    pub fn contains(&self, id: &MetadataId) -> bool {
        self.inner.lock().items.contains(id)
    }

    /// Store an item under its identifier
    pub fn put(&self, id: MetadataId, item: Arc<dyn MetadataItem>) {
        let mut inner = self.inner.lock();
        inner.items.put(id, item);
        inner.stats.puts += 1;
    }

    /// Remove one item; returns whether it was present
    pub fn evict(&self, id: &MetadataId) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.items.pop(id).is_some();
        if removed {
            inner.stats.evictions += 1;
        }
        removed
    }

    /// Remove every item
    pub fn evict_all(&self) {
        let mut inner = self.inner.lock();
        let held = inner.items.len() as u64;
        inner.items.clear();
        inner.stats.evictions += held;
    }

    /// Number of items held
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether nothing is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            len: inner.items.len(),
            capacity: inner.items.cap().get(),
            ..inner.stats
        }
    }
}
