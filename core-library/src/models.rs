//! Domain models for the podcast library
//!
//! Rich domain models with validation. Identifiers are UUID newtypes that
//! repositories persist as hyphenated strings; timestamps are Unix epoch
//! milliseconds to match what the durable store records.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a podcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodcastId(pub Uuid);

impl PodcastId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PodcastId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PodcastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeId(pub Uuid);

impl EpisodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookmarkId(pub Uuid);

impl BookmarkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for BookmarkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for the owning user, as issued by the external auth layer.
///
/// Opaque to the core; not assumed to be a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A subscribed podcast with its episode list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: PodcastId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub feed_url: String,
    /// Unix epoch milliseconds of subscription time; drives newest-first
    /// library ordering.
    pub created_at: i64,
    pub episodes: Vec<Episode>,
}

impl Podcast {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Podcast title cannot be empty".to_string());
        }

        if self.feed_url.trim().is_empty() {
            return Err("Podcast feed URL cannot be empty".to_string());
        }

        for episode in &self.episodes {
            episode.validate()?;
        }

        Ok(())
    }
}

/// One episode of a podcast, including the durable per-user playback state.
///
/// The playback state fields (`progress`, `played`, `last_played`) are mutated
/// only by the playback session and its checkpoint writer; everything else
/// comes from feed ingestion and is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub podcast_id: PodcastId,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    /// Publication date as reported by the feed.
    pub pub_date: Option<String>,
    /// Duration hint in seconds, when the feed carried one. The audio layer's
    /// reported duration takes precedence during playback.
    pub duration_secs: Option<f64>,
    /// Resume progress as a fraction in `[0, 1]`.
    pub progress: f64,
    pub played: bool,
    /// Unix epoch milliseconds of the last playback activity.
    pub last_played: Option<i64>,
}

impl Episode {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Episode title cannot be empty".to_string());
        }

        if self.audio_url.trim().is_empty() {
            return Err("Episode audio URL cannot be empty".to_string());
        }

        if !(0.0..=1.0).contains(&self.progress) {
            return Err(format!(
                "Episode progress {} is outside [0, 1]",
                self.progress
            ));
        }

        if let Some(duration) = self.duration_secs {
            if duration < 0.0 {
                return Err("Episode duration cannot be negative".to_string());
            }
        }

        Ok(())
    }

    /// Whether this episode belongs in the history projection.
    pub fn qualifies_for_history(&self) -> bool {
        self.progress > 0.0 || self.played
    }

    /// Absolute resume position in seconds for a source of `duration` seconds.
    pub fn resume_position(&self, duration: f64) -> f64 {
        (self.progress * duration).clamp(0.0, duration)
    }
}

/// A user-captured timestamp within an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub user_id: UserId,
    pub episode_id: EpisodeId,
    /// Position in seconds. No upper bound: the episode duration may be
    /// unknown at capture time.
    pub timestamp_secs: f64,
    pub note: Option<String>,
    /// Unix epoch milliseconds of capture time.
    pub created_at: i64,
}

impl Bookmark {
    pub fn validate(&self) -> Result<(), String> {
        if self.timestamp_secs < 0.0 {
            return Err("Bookmark timestamp cannot be negative".to_string());
        }

        Ok(())
    }
}

/// Snapshot of the durable per-episode playback state written by a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStateUpdate {
    /// Progress fraction in `[0, 1]`, already rounded for storage.
    pub progress: f64,
    pub played: bool,
    /// Unix epoch milliseconds.
    pub last_played: i64,
}

impl EpisodeStateUpdate {
    /// Build an update from a raw progress fraction, clamping to `[0, 1]` and
    /// rounding to two decimal places the way checkpoints are persisted.
    pub fn checkpoint(progress: f64, played: bool, last_played: i64) -> Self {
        let clamped = progress.clamp(0.0, 1.0);
        Self {
            progress: (clamped * 100.0).round() / 100.0,
            played,
            last_played,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.progress) {
            return Err(format!("Progress {} is outside [0, 1]", self.progress));
        }

        Ok(())
    }
}
