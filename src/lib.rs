//! feedcache - tiered read-through cache for feed data
//!
//! Three tiers back every lookup: a bounded in-process tier with LRU
//! eviction, a weak tier that gives evicted values a second chance while
//! anything else still references them, and a SQLite-backed persistent tier
//! with lazy TTL expiration that survives restarts. A repository layer on
//! top decides TTLs per data class and fetches from the origin on a miss.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;

pub use cache::{CacheCoordinator, CacheEntry, DiskStore, StatsSnapshot, StrongTier, WeakTier};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use models::{FeedItem, FeedPage, LandingConfig};
pub use repository::{FeedOrigin, FeedRepository, OriginError};
