//! Weak Tier Module
//!
//! Second-chance store for entries evicted from the strong tier. Slots hold
//! downgraded references that never extend a value's lifetime: if every
//! strong owner is gone, the upgrade fails and the lookup behaves exactly
//! like a miss. Callers can not distinguish "never stored" from "reclaimed",
//! and must not try to.

use std::collections::HashMap;
use std::sync::Weak;

use crate::cache::entry::CacheEntry;

// == Weak Slot ==
/// A non-owning reference plus the timestamps of the entry it came from.
struct WeakSlot<V> {
    value: Weak<V>,
    created_at: u64,
    expires_at: u64,
}

// == Weak Tier ==
/// Unbounded map of non-owning references.
///
/// Unbounded by policy only: dead slots are pruned on every insert and
/// dropped eagerly when an upgrade fails, so the map tracks at most the
/// values that are still alive somewhere in the program.
pub struct WeakTier<V> {
    slots: HashMap<String, WeakSlot<V>>,
}

impl<V> WeakTier<V> {
    // == Constructor ==
    /// Creates an empty tier.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    // == Insert ==
    /// Stores a non-owning reference to the entry's value.
    ///
    /// The tier does not keep the value alive; whoever holds the entry's
    /// `Arc` does.
    pub fn insert(&mut self, key: String, entry: &CacheEntry<V>) {
        self.slots.retain(|_, slot| slot.value.strong_count() > 0);
        self.slots.insert(
            key,
            WeakSlot {
                value: std::sync::Arc::downgrade(&entry.value),
                created_at: entry.created_at,
                expires_at: entry.expires_at,
            },
        );
    }

    // == Get ==
    /// Attempts to resolve the reference for `key`.
    ///
    /// Returns None both when the key is absent and when the value has been
    /// reclaimed; a dead slot is removed on the way out.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let (upgraded, created_at, expires_at) = match self.slots.get(key) {
            Some(slot) => (slot.value.upgrade(), slot.created_at, slot.expires_at),
            None => return None,
        };

        match upgraded {
            Some(value) => Some(CacheEntry::from_parts(value, created_at, expires_at)),
            None => {
                self.slots.remove(key);
                None
            }
        }
    }

    // == Remove ==
    /// Drops the slot for `key` regardless of resolvability.
    pub fn remove(&mut self, key: &str) {
        self.slots.remove(key);
    }

    // == Clear ==
    /// Drops all slots.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    // == Length ==
    /// Returns the number of slots, live or dead.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<V> Default for WeakTier<V> {
    fn default() -> Self {
        Self::new()
    }
}
