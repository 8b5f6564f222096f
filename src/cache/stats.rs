//! Cache Statistics Module
//!
//! Tracks per-tier hit counters plus misses, evictions and promotions.
//! Counters are atomic because the coordinator is shared across tasks and
//! records through `&self`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Live counters owned by the coordinator.
#[derive(Debug, Default)]
pub struct CacheStats {
    strong_hits: AtomicU64,
    weak_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    promotions: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates stats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Recorders ==
    /// Increments the strong tier hit counter.
    pub fn record_strong_hit(&self) {
        self.strong_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the weak tier hit counter.
    pub fn record_weak_hit(&self) {
        self.weak_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the persistent tier hit counter.
    pub fn record_disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the promotion counter.
    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            strong_hits: self.strong_hits.load(Ordering::Relaxed),
            weak_hits: self.weak_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
        }
    }
}

// == Stats Snapshot ==
/// Plain counter values handed to readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Lookups satisfied by the strong tier
    pub strong_hits: u64,
    /// Lookups satisfied by the weak tier
    pub weak_hits: u64,
    /// Lookups satisfied by the persistent tier
    pub disk_hits: u64,
    /// Lookups no tier could satisfy
    pub misses: u64,
    /// Entries evicted from the strong tier by capacity pressure
    pub evictions: u64,
    /// Entries copied back into the strong tier from a lower tier
    pub promotions: u64,
}

impl StatsSnapshot {
    // == Hits ==
    /// Total lookups satisfied by any tier.
    pub fn hits(&self) -> u64 {
        self.strong_hits + self.weak_hits + self.disk_hits
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = CacheStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_recorders() {
        let stats = CacheStats::new();

        stats.record_strong_hit();
        stats.record_strong_hit();
        stats.record_weak_hit();
        stats.record_disk_hit();
        stats.record_miss();
        stats.record_eviction();
        stats.record_promotion();

        let snap = stats.snapshot();
        assert_eq!(snap.strong_hits, 2);
        assert_eq!(snap.weak_hits, 1);
        assert_eq!(snap.disk_hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.evictions, 1);
        assert_eq!(snap.promotions, 1);
        assert_eq!(snap.hits(), 4);
    }

    #[test]
    fn test_hit_rate_no_lookups() {
        let stats = CacheStats::new();
        assert_eq!(stats.snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new();
        stats.record_strong_hit();
        stats.record_miss();

        assert_eq!(stats.snapshot().hit_rate(), 0.5);
    }
}
