//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries the strong tier can hold
    pub capacity: usize,
    /// Directory for the persistent tier databases; None disables persistence
    pub db_dir: Option<PathBuf>,
    /// TTL applied to cached feed pages
    pub feed_page_ttl: Duration,
    /// TTL applied to the cached landing configuration
    pub landing_config_ttl: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Strong tier entry limit (default: 64)
    /// - `CACHE_DB_DIR` - Persistent tier directory (default: unset, persistence disabled)
    /// - `FEED_PAGE_TTL_SECS` - Feed page TTL in seconds (default: 120)
    /// - `LANDING_CONFIG_TTL_SECS` - Landing configuration TTL in seconds (default: 1800)
    pub fn from_env() -> Self {
        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64),
            db_dir: env::var("CACHE_DB_DIR").ok().map(PathBuf::from),
            feed_page_ttl: Duration::from_secs(
                env::var("FEED_PAGE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(120),
            ),
            landing_config_ttl: Duration::from_secs(
                env::var("LANDING_CONFIG_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1800),
            ),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            db_dir: None,
            feed_page_ttl: Duration::from_secs(120),
            landing_config_ttl: Duration::from_secs(1800),
        }
    }
}
