//! Feed Repository Module
//!
//! The consumer side of the cache: decides TTLs per data class, performs
//! read-through fetches against the origin on a miss, and refreshes hot
//! entries ahead of expiry. The cache itself has no opinion on TTL values
//! or on when to re-fetch; both policies live here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{now_ms, CacheCoordinator, StatsSnapshot};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::{FeedPage, LandingConfig};

/// The landing configuration is a single logical entry.
const LANDING_CAPACITY: usize = 1;

// == Origin Error ==
/// Error surfaced by an origin fetch.
///
/// This is the only error the repository ever returns: cache failures are
/// absorbed by the cache subsystem and simply force a fetch.
#[derive(Debug, Error)]
#[error("origin fetch failed: {0}")]
pub struct OriginError(pub String);

// == Feed Origin ==
/// Where feed data comes from when every cache tier misses.
#[async_trait]
pub trait FeedOrigin: Send + Sync + 'static {
    /// Fetches one page of the feed.
    async fn fetch_page(&self, page: u32) -> std::result::Result<FeedPage, OriginError>;

    /// Fetches the landing-screen configuration.
    async fn fetch_landing(&self) -> std::result::Result<LandingConfig, OriginError>;
}

// == Feed Repository ==
/// Read-through repository over the tiered cache.
///
/// Feed pages and the landing configuration are cached separately, each
/// under its own TTL class (pages turn over in minutes, the landing
/// configuration in tens of minutes).
pub struct FeedRepository<O> {
    origin: Arc<O>,
    pages: Arc<CacheCoordinator<FeedPage>>,
    landing: Arc<CacheCoordinator<LandingConfig>>,
    page_ttl: Duration,
    landing_ttl: Duration,
    /// When this repository last stored each key, for refresh-ahead
    stored_at: Arc<Mutex<HashMap<String, u64>>>,
}

impl<O: FeedOrigin> FeedRepository<O> {
    // == Constructor ==
    /// Builds a repository from configuration.
    ///
    /// With `db_dir` set, each data class persists to its own database file
    /// under that directory; otherwise both caches are memory-only. Must be
    /// called from within a Tokio runtime when persistence is enabled.
    pub fn new(config: &CacheConfig, origin: O) -> Result<Self> {
        let (pages, landing) = match &config.db_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                (
                    CacheCoordinator::with_disk(config.capacity, dir.join("feed_pages.db"))?,
                    CacheCoordinator::with_disk(LANDING_CAPACITY, dir.join("landing.db"))?,
                )
            }
            None => (
                CacheCoordinator::in_memory(config.capacity)?,
                CacheCoordinator::in_memory(LANDING_CAPACITY)?,
            ),
        };

        Ok(Self {
            origin: Arc::new(origin),
            pages: Arc::new(pages),
            landing: Arc::new(landing),
            page_ttl: config.feed_page_ttl,
            landing_ttl: config.landing_config_ttl,
            stored_at: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    // == Get Page ==
    /// Returns one feed page, from cache when possible.
    ///
    /// On a cache hit past half the page TTL, a background refresh is
    /// started so hot pages are rewritten before they expire. On a miss the
    /// origin is fetched inline and the result cached.
    pub async fn get_page(&self, page: u32) -> std::result::Result<Arc<FeedPage>, OriginError> {
        let key = FeedPage::cache_key(page);

        if let Some(cached) = self.pages.get(&key).await {
            debug!("feed page {} served from cache", page);
            if self.refresh_due(&key, self.page_ttl) {
                self.spawn_page_refresh(page, key);
            }
            return Ok(cached);
        }

        let fetched = self.origin.fetch_page(page).await?;
        let handle = self.pages.put(key.clone(), fetched, self.page_ttl);
        self.mark_stored(key);
        Ok(handle)
    }

    // == Get Landing ==
    /// Returns the landing configuration, from cache when possible.
    pub async fn get_landing(&self) -> std::result::Result<Arc<LandingConfig>, OriginError> {
        let key = LandingConfig::CACHE_KEY;

        if let Some(cached) = self.landing.get(key).await {
            debug!("landing configuration served from cache");
            if self.refresh_due(key, self.landing_ttl) {
                self.spawn_landing_refresh();
            }
            return Ok(cached);
        }

        let fetched = self.origin.fetch_landing().await?;
        let handle = self.landing.put(key, fetched, self.landing_ttl);
        self.mark_stored(key.to_string());
        Ok(handle)
    }

    // == Invalidation ==
    /// Drops a single page from every cache tier.
    pub async fn invalidate_page(&self, page: u32) {
        let key = FeedPage::cache_key(page);
        self.pages.remove(&key).await;
        self.lock_stored().remove(&key);
    }

    /// Drops the landing configuration from every cache tier.
    pub async fn invalidate_landing(&self) {
        self.landing.remove(LandingConfig::CACHE_KEY).await;
        self.lock_stored().remove(LandingConfig::CACHE_KEY);
    }

    /// Drops everything this repository has cached.
    pub async fn invalidate_all(&self) {
        self.pages.clear().await;
        self.landing.clear().await;
        self.lock_stored().clear();
    }

    // == Stats ==
    /// Counters for the feed-page cache.
    pub fn page_stats(&self) -> StatsSnapshot {
        self.pages.stats()
    }

    // == Internals ==
    /// True when this repository stored `key` more than half its TTL ago.
    fn refresh_due(&self, key: &str, ttl: Duration) -> bool {
        let stored = self.lock_stored().get(key).copied();
        match stored {
            Some(at) => now_ms().saturating_sub(at) >= ttl.as_millis() as u64 / 2,
            None => false,
        }
    }

    fn spawn_page_refresh(&self, page: u32, key: String) {
        // marked before the fetch so concurrent hits do not pile up refreshes
        self.mark_stored(key.clone());

        let origin = Arc::clone(&self.origin);
        let pages = Arc::clone(&self.pages);
        let ttl = self.page_ttl;
        tokio::spawn(async move {
            match origin.fetch_page(page).await {
                Ok(fresh) => {
                    pages.put(key, fresh, ttl);
                    debug!("feed page {} refreshed ahead of expiry", page);
                }
                Err(e) => warn!("refresh-ahead for feed page {} failed: {}", page, e),
            }
        });
    }

    fn spawn_landing_refresh(&self) {
        self.mark_stored(LandingConfig::CACHE_KEY.to_string());

        let origin = Arc::clone(&self.origin);
        let landing = Arc::clone(&self.landing);
        let ttl = self.landing_ttl;
        tokio::spawn(async move {
            match origin.fetch_landing().await {
                Ok(fresh) => {
                    landing.put(LandingConfig::CACHE_KEY, fresh, ttl);
                    debug!("landing configuration refreshed ahead of expiry");
                }
                Err(e) => warn!("refresh-ahead for landing configuration failed: {}", e),
            }
        });
    }

    fn mark_stored(&self, key: String) {
        self.lock_stored().insert(key, now_ms());
    }

    fn lock_stored(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.stored_at.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedItem;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Origin that counts fetches and stamps pages with a version number.
    struct CountingOrigin {
        page_fetches: AtomicU32,
        landing_fetches: AtomicU32,
    }

    impl CountingOrigin {
        fn new() -> Self {
            Self {
                page_fetches: AtomicU32::new(0),
                landing_fetches: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl FeedOrigin for Arc<CountingOrigin> {
        async fn fetch_page(&self, page: u32) -> std::result::Result<FeedPage, OriginError> {
            let version = self.page_fetches.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(FeedPage {
                page,
                items: vec![FeedItem {
                    id: format!("item-{}-v{}", page, version),
                    title: format!("Page {} v{}", page, version),
                    image_url: None,
                }],
            })
        }

        async fn fetch_landing(&self) -> std::result::Result<LandingConfig, OriginError> {
            self.landing_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(LandingConfig {
                headline: "Today".to_string(),
                promo_banner: None,
                sections: vec!["top".to_string()],
            })
        }
    }

    fn config() -> CacheConfig {
        CacheConfig {
            capacity: 8,
            db_dir: None,
            feed_page_ttl: Duration::from_secs(120),
            landing_config_ttl: Duration::from_secs(1800),
        }
    }

    #[tokio::test]
    async fn test_read_through_fetches_once() {
        let origin = Arc::new(CountingOrigin::new());
        let repo = FeedRepository::new(&config(), Arc::clone(&origin)).unwrap();

        let first = repo.get_page(0).await.unwrap();
        let second = repo.get_page(0).await.unwrap();

        assert_eq!(origin.page_fetches.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_distinct_pages_fetch_separately() {
        let origin = Arc::new(CountingOrigin::new());
        let repo = FeedRepository::new(&config(), Arc::clone(&origin)).unwrap();

        repo.get_page(0).await.unwrap();
        repo.get_page(1).await.unwrap();

        assert_eq!(origin.page_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_page_forces_refetch() {
        let origin = Arc::new(CountingOrigin::new());
        let repo = FeedRepository::new(&config(), Arc::clone(&origin)).unwrap();

        repo.get_page(0).await.unwrap();
        repo.invalidate_page(0).await;
        repo.get_page(0).await.unwrap();

        assert_eq!(origin.page_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_landing_read_through() {
        let origin = Arc::new(CountingOrigin::new());
        let repo = FeedRepository::new(&config(), Arc::clone(&origin)).unwrap();

        let first = repo.get_landing().await.unwrap();
        let second = repo.get_landing().await.unwrap();

        assert_eq!(origin.landing_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(first.headline, "Today");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_refresh_ahead_rewrites_hot_page() {
        let origin = Arc::new(CountingOrigin::new());
        let mut cfg = config();
        cfg.feed_page_ttl = Duration::from_millis(1_000);
        let repo = FeedRepository::new(&cfg, Arc::clone(&origin)).unwrap();

        repo.get_page(0).await.unwrap();
        assert_eq!(origin.page_fetches.load(Ordering::SeqCst), 1);

        // past half the TTL: the hit is still served and a background
        // refresh is started
        tokio::time::sleep(Duration::from_millis(600)).await;
        let served = repo.get_page(0).await.unwrap();
        assert_eq!(served.items[0].title, "Page 0 v1");

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(origin.page_fetches.load(Ordering::SeqCst), 2);

        // the refreshed copy is now what the cache serves
        let refreshed = repo.get_page(0).await.unwrap();
        assert_eq!(refreshed.items[0].title, "Page 0 v2");
    }

    #[tokio::test]
    async fn test_fresh_hit_does_not_refresh() {
        let origin = Arc::new(CountingOrigin::new());
        let repo = FeedRepository::new(&config(), Arc::clone(&origin)).unwrap();

        repo.get_page(0).await.unwrap();
        repo.get_page(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(origin.page_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let origin = Arc::new(CountingOrigin::new());
        let repo = FeedRepository::new(&config(), Arc::clone(&origin)).unwrap();

        repo.get_page(0).await.unwrap();
        repo.get_landing().await.unwrap();
        repo.invalidate_all().await;

        repo.get_page(0).await.unwrap();
        repo.get_landing().await.unwrap();

        assert_eq!(origin.page_fetches.load(Ordering::SeqCst), 2);
        assert_eq!(origin.landing_fetches.load(Ordering::SeqCst), 2);
    }
}
