//! Recency-bounded duplicate suppression
//!
//! The cache remembers only the `capacity` most recently seen keys, so it is
//! a sliding window rather than an exact set: a key seen again after
//! `capacity` other distinct keys passes through a second time.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::error::ConfigError;

/// Fixed-capacity LRU of previously accepted keys
///
/// Owned by the single consumer loop, so it needs no locking.
pub struct DedupCache {
    seen: LruCache<String, ()>,
}

impl DedupCache {
    /// Create a cache holding at most `capacity` keys
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        let capacity =
            NonZeroUsize::new(capacity).ok_or(ConfigError::InvalidCacheCapacity(capacity))?;
        Ok(Self {
            seen: LruCache::new(capacity),
        })
    }

    /// Whether a record with this key should be emitted
    ///
    /// A miss records the key, evicting the least recently used one when
    /// full, and returns `true`. A hit refreshes the key and returns `false`.
    pub fn should_emit(&mut self, key: &str) -> bool {
        if self.seen.get(key).is_some() {
            return false;
        }

        if let Some((evicted, ())) = self.seen.push(key.to_string(), ()) {
            tracing::trace!(evicted = %evicted, "dedup cache eviction");
        }
        true
    }

    /// Whether the key is currently remembered, without touching recency
    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.seen.cap().get()
    }
}
