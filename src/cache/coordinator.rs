//! Cache Coordinator Module
//!
//! Orchestrates lookups across the three tiers: strong (bounded LRU), weak
//! (non-owning second chance) and persistent (SQLite, write-behind). Reads
//! walk the tiers in order and promote hits from a lower tier back into the
//! strong tier; writes land in the strong tier synchronously and are
//! dispatched to the persistent tier in the background.
//!
//! The coordinator never fails its own API. Tier-level failures such as
//! serialization errors, I/O errors and reclaimed weak references are
//! absorbed and presented as misses; the caller's fallback is always the
//! origin fetch.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::disk::DiskStore;
use crate::cache::entry::CacheEntry;
use crate::cache::stats::{CacheStats, StatsSnapshot};
use crate::cache::strong::StrongTier;
use crate::cache::weak::WeakTier;
use crate::error::Result;

// == Cache Coordinator ==
/// Tiered read-through cache over values of type `V`.
///
/// Returned values are shared (`Arc<V>`) and must be treated as read-only:
/// the same allocation may be referenced by the strong tier, the weak tier
/// and other concurrent readers.
pub struct CacheCoordinator<V> {
    /// Bounded LRU tier; a single mutex guards recency and capacity state
    strong: Mutex<StrongTier<V>>,
    /// Second-chance tier, shared with the strong tier's eviction callback
    weak: Arc<Mutex<WeakTier<V>>>,
    /// Persistent tier; None disables persistence entirely
    disk: Option<DiskStore>,
    /// Per-tier hit/miss counters
    stats: Arc<CacheStats>,
}

impl<V> CacheCoordinator<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    // == Constructors ==
    /// Builds a coordinator over an optional persistent tier.
    ///
    /// Eviction from the strong tier feeds the weak tier: the evicted entry
    /// is downgraded to a non-owning reference, giving values still in use
    /// elsewhere a second chance without extending their lifetime.
    pub fn new(capacity: usize, disk: Option<DiskStore>) -> Result<Self> {
        let weak = Arc::new(Mutex::new(WeakTier::new()));
        let stats = Arc::new(CacheStats::new());

        let weak_for_evictions = Arc::clone(&weak);
        let stats_for_evictions = Arc::clone(&stats);
        let strong = StrongTier::with_eviction_callback(
            capacity,
            Box::new(move |key, evicted| {
                weak_for_evictions
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(key.to_string(), &evicted);
                stats_for_evictions.record_eviction();
                debug!("'{}' evicted from strong tier, demoted to weak tier", key);
            }),
        )?;

        Ok(Self {
            strong: Mutex::new(strong),
            weak,
            disk,
            stats,
        })
    }

    /// Coordinator with no persistent tier.
    pub fn in_memory(capacity: usize) -> Result<Self> {
        Self::new(capacity, None)
    }

    /// Coordinator persisting to the database at `path`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_disk(capacity: usize, path: impl AsRef<Path>) -> Result<Self> {
        Self::new(capacity, Some(DiskStore::open(path)?))
    }

    // == Get ==
    /// Looks `key` up tier by tier: strong, then weak, then persistent.
    ///
    /// A hit in a lower tier is promoted into the strong tier with its
    /// original timestamps. Expired entries are discarded wherever they are
    /// found and the lookup continues downward, converging to a miss once
    /// every tier has dropped its stale copy.
    pub async fn get(&self, key: &str) -> Option<Arc<V>> {
        // Strong tier
        {
            let mut strong = self.lock_strong();
            if let Some(entry) = strong.get(key) {
                if entry.is_expired() {
                    strong.remove(key);
                } else {
                    self.stats.record_strong_hit();
                    return Some(entry.value);
                }
            }
        }

        // Weak tier; a reclaimed reference is indistinguishable from absence
        let resolved = self.lock_weak().get(key);
        if let Some(entry) = resolved {
            if entry.is_expired() {
                self.lock_weak().remove(key);
            } else {
                self.promote(key, entry.clone());
                self.stats.record_weak_hit();
                debug!("weak tier hit for '{}', promoted to strong tier", key);
                return Some(entry.value);
            }
        }

        // Persistent tier
        if let Some(disk) = &self.disk {
            if let Some(record) = disk.get(key).await {
                match serde_json::from_str::<V>(&record.payload) {
                    Ok(value) => {
                        let entry = CacheEntry::from_parts(
                            Arc::new(value),
                            record.created_at,
                            record.expires_at,
                        );
                        self.promote(key, entry.clone());
                        self.stats.record_disk_hit();
                        debug!("disk hit for '{}', promoted to strong tier", key);
                        return Some(entry.value);
                    }
                    Err(e) => {
                        // corrupt rows are deleted so they cannot fail twice
                        warn!("corrupt record for '{}' dropped: {}", key, e);
                        disk.remove(key).await;
                    }
                }
            }
        }

        self.stats.record_miss();
        None
    }

    // == Put ==
    /// Stores `value` under `key` with the given TTL.
    ///
    /// The strong tier is updated synchronously (evicting if full); the
    /// persistent write is dispatched to the write-behind queue and never
    /// blocks the caller. Returns the shared handle now held by the cache,
    /// so callers can keep the value alive for the weak tier's benefit.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) -> Arc<V> {
        let key = key.into();
        let entry = CacheEntry::new(value, ttl);

        if let Some(disk) = &self.disk {
            match serde_json::to_string(entry.value.as_ref()) {
                Ok(payload) => disk.put(&key, payload, entry.created_at, entry.ttl_ms()),
                Err(e) => warn!("failed to serialize '{}' for persistent tier: {}", key, e),
            }
        }

        let handle = Arc::clone(&entry.value);
        self.lock_strong().put(key, entry);
        handle
    }

    // == Remove ==
    /// Removes `key` from every tier, whether or not it was present.
    pub async fn remove(&self, key: &str) {
        self.lock_strong().remove(key);
        self.lock_weak().remove(key);
        if let Some(disk) = &self.disk {
            disk.remove(key).await;
        }
    }

    // == Clear ==
    /// Empties every tier.
    pub async fn clear(&self) {
        self.lock_strong().clear();
        self.lock_weak().clear();
        if let Some(disk) = &self.disk {
            disk.clear().await;
        }
    }

    // == Stats ==
    /// Returns a snapshot of the hit/miss/eviction counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // == Length ==
    /// Number of entries currently owned by the strong tier.
    pub fn len(&self) -> usize {
        self.lock_strong().len()
    }

    /// True when the strong tier is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_strong().is_empty()
    }

    // == Internals ==
    /// Copies an entry from a lower tier into the strong tier.
    ///
    /// The source tier's copy is left in place: the weak slot is refreshed
    /// by the next eviction and the persistent row remains the durable copy.
    fn promote(&self, key: &str, entry: CacheEntry<V>) {
        self.lock_strong().put(key.to_string(), entry);
        self.stats.record_promotion();
    }

    /// A poisoned lock still holds consistent tier state; recover it rather
    /// than fail the cache path.
    fn lock_strong(&self) -> MutexGuard<'_, StrongTier<V>> {
        self.strong.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_weak(&self) -> MutexGuard<'_, WeakTier<V>> {
        self.weak.lock().unwrap_or_else(|e| e.into_inner())
    }
}
