//! Cache Entry Module
//!
//! Defines the structure shared by all tiers: a reference-counted value plus
//! the timestamps that drive lazy TTL expiration.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single cache entry.
///
/// The value is held behind an `Arc` so the same allocation can be shared by
/// the strong tier, the weak tier (as a downgraded reference) and any caller
/// currently using it. Callers must treat the value as read-only.
///
/// Timestamps travel with the entry through promotions: a value promoted out
/// of a lower tier keeps its original `created_at` and `expires_at`, so
/// promotion never extends a lifetime.
pub struct CacheEntry<V> {
    /// The stored value, shared across tiers and callers
    pub value: Arc<V>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(value: V, ttl: Duration) -> Self {
        let now = now_ms();
        Self {
            value: Arc::new(value),
            created_at: now,
            expires_at: now + ttl.as_millis() as u64,
        }
    }

    /// Rebuilds an entry from stored timestamps, e.g. when promoting a
    /// persistent record back into the strong tier.
    pub fn from_parts(value: Arc<V>, created_at: u64, expires_at: u64) -> Self {
        Self {
            value,
            created_at,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time reaches
    /// the expiration time, so a read exactly at `created_at + ttl` misses.
    pub fn is_expired(&self) -> bool {
        now_ms() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the TTL this entry was stored with, in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.expires_at - self.created_at
    }

    /// Returns remaining TTL in milliseconds; zero once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(now_ms())
    }
}

// Manual impl: cloning shares the value allocation and must not require
// `V: Clone`.
impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
