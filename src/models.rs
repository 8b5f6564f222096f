//! Feed Data Models
//!
//! Payload types cached by the repository layer: paginated feed pages and
//! the landing-screen configuration. Each logical data class owns its cache
//! key namespace.

use serde::{Deserialize, Serialize};

// == Feed Item ==
/// A single entry in the content feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Stable identifier supplied by the origin
    pub id: String,
    /// Display title
    pub title: String,
    /// Optional thumbnail location
    pub image_url: Option<String>,
}

// == Feed Page ==
/// One page of the paginated feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    /// Zero-based page number
    pub page: u32,
    /// Items on this page, in feed order
    pub items: Vec<FeedItem>,
}

impl FeedPage {
    /// Cache key for a given page number.
    pub fn cache_key(page: u32) -> String {
        format!("feed:page:{}", page)
    }
}

// == Landing Configuration ==
/// Remotely controlled landing-screen configuration.
///
/// Changes rarely, so the repository caches it under a much longer TTL than
/// feed pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingConfig {
    /// Headline shown above the feed
    pub headline: String,
    /// Optional promotional banner text
    pub promo_banner: Option<String>,
    /// Ordered section identifiers to render
    pub sections: Vec<String>,
}

impl LandingConfig {
    /// Cache key for the single landing configuration entry.
    pub const CACHE_KEY: &'static str = "landing:config";
}
