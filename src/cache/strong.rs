//! Strong Tier Module
//!
//! Bounded, strongly-owned cache tier combining HashMap storage with LRU
//! recency tracking. When an insert would exceed capacity, the least
//! recently used entry is evicted and handed to the eviction callback so a
//! lower tier can keep a second-chance reference to it.
//!
//! TTL is not interpreted here: entries carry their timestamps and the
//! coordinator decides what an expired entry means.

use std::collections::HashMap;

use crate::cache::entry::CacheEntry;
use crate::cache::lru::LruTracker;
use crate::error::{CacheError, Result};

// == Eviction Callback ==
/// Invoked synchronously with the evicted key and entry when capacity
/// pressure pushes an entry out.
///
/// The callback runs while the tier is being mutated and must not call back
/// into it.
pub type EvictionCallback<V> = Box<dyn Fn(&str, CacheEntry<V>) + Send + Sync>;

// == Strong Tier ==
/// Bounded LRU cache tier owning its entries.
pub struct StrongTier<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency tracker
    lru: LruTracker,
    /// Maximum number of entries
    capacity: usize,
    /// Receives entries evicted by capacity pressure
    on_evict: Option<EvictionCallback<V>>,
}

impl<V> StrongTier<V> {
    // == Constructor ==
    /// Creates a tier holding at most `capacity` entries.
    ///
    /// A capacity of zero is a configuration error and is rejected rather
    /// than clamped.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            capacity,
            on_evict: None,
        })
    }

    /// Creates a tier that reports capacity evictions through `on_evict`.
    pub fn with_eviction_callback(capacity: usize, on_evict: EvictionCallback<V>) -> Result<Self> {
        let mut tier = Self::new(capacity)?;
        tier.on_evict = Some(on_evict);
        Ok(tier)
    }

    // == Get ==
    /// Returns the entry for `key` and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.get(key)?.clone();
        self.lru.touch(key);
        Some(entry)
    }

    // == Contains ==
    /// Checks for a key without affecting recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Put ==
    /// Inserts or replaces an entry.
    ///
    /// Replacing an existing key never evicts. Inserting a new key into a
    /// full tier first evicts the least recently used entry and reports it
    /// to the eviction callback.
    pub fn put(&mut self, key: String, entry: CacheEntry<V>) {
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.capacity {
            if let Some(oldest) = self.lru.evict_oldest() {
                if let Some(evicted) = self.entries.remove(&oldest) {
                    if let Some(on_evict) = &self.on_evict {
                        on_evict(&oldest, evicted);
                    }
                }
            }
        }

        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
    }

    // == Remove ==
    /// Removes and returns the entry for `key`, if present.
    ///
    /// Explicit removal is not an eviction; the callback does not fire.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        Some(entry)
    }

    // == Clear ==
    /// Empties the tier. The eviction callback does not fire.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
