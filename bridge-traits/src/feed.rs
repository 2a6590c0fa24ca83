//! Feed ingestion bridge trait.
//!
//! Fetching and parsing RSS is a host concern; the core only consumes the
//! normalized result. Implementations are expected to handle redirects,
//! timeouts, and the many flavors of podcast RSS, and to return episodes in
//! feed order (newest first for typical feeds).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One episode as normalized from a feed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEpisode {
    pub title: String,
    pub description: String,
    /// Enclosure URL. Items without an audio enclosure are dropped by the
    /// ingester, so this is always present.
    pub audio_url: String,
    /// Item-level artwork, falling back to channel artwork when absent.
    pub image_url: Option<String>,
    /// Publication date as reported by the feed (RFC 2822 or similar).
    pub pub_date: Option<String>,
    /// Duration hint in seconds, when the feed carries a usable
    /// `itunes:duration` tag.
    pub duration_secs: Option<f64>,
}

/// A normalized podcast feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub episodes: Vec<ParsedEpisode>,
}

/// Trait for host feed fetchers/parsers.
#[async_trait]
pub trait FeedIngest: Send + Sync {
    /// Fetch `feed_url` and normalize it.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::FeedFetch`](crate::BridgeError::FeedFetch) for network
    ///   failures or non-success HTTP statuses
    /// - [`BridgeError::FeedParse`](crate::BridgeError::FeedParse) for
    ///   responses that are not a podcast feed
    async fn fetch(&self, feed_url: &str) -> Result<ParsedFeed>;
}
