//! # Library Service
//!
//! Owns the in-memory picture of the user's subscriptions and keeps it in
//! step with the durable store. All episode lookups during playback go
//! through the snapshot here; the database is only touched on mutation.

use crate::error::{LibraryError, Result};
use crate::models::{
    Bookmark, Episode, EpisodeId, EpisodeStateUpdate, Podcast, PodcastId, UserId,
};
use crate::repositories::{EpisodeStateRepository, PodcastRepository};
use bridge_traits::feed::FeedIngest;
use bridge_traits::time::Clock;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// The user's podcast library.
///
/// Cloning is cheap; all clones share the same snapshot and repositories.
#[derive(Clone)]
pub struct LibraryService {
    podcast_repo: Arc<dyn PodcastRepository>,
    episode_repo: Arc<dyn EpisodeStateRepository>,
    feed_ingest: Arc<dyn FeedIngest>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    user: UserId,
    /// Newest-subscription-first, mirroring the repository ordering.
    podcasts: Arc<RwLock<Vec<Podcast>>>,
}

impl LibraryService {
    pub fn new(
        podcast_repo: Arc<dyn PodcastRepository>,
        episode_repo: Arc<dyn EpisodeStateRepository>,
        feed_ingest: Arc<dyn FeedIngest>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        user: UserId,
    ) -> Self {
        Self {
            podcast_repo,
            episode_repo,
            feed_ingest,
            clock,
            events,
            user,
            podcasts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Load the library from the durable store into the snapshot.
    ///
    /// Safe to call again; the snapshot is replaced wholesale.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn load(&self) -> Result<()> {
        let podcasts = self.podcast_repo.load_all(&self.user).await?;
        info!(podcast_count = podcasts.len(), "Library loaded");
        *self.podcasts.write().await = podcasts;
        Ok(())
    }

    /// Current library snapshot, newest subscription first.
    pub async fn podcasts(&self) -> Vec<Podcast> {
        self.podcasts.read().await.clone()
    }

    /// Find an episode across all subscribed podcasts.
    pub async fn find_episode(&self, episode_id: EpisodeId) -> Option<Episode> {
        let podcasts = self.podcasts.read().await;
        podcasts
            .iter()
            .flat_map(|p| p.episodes.iter())
            .find(|e| e.id == episode_id)
            .cloned()
    }

    /// Flat list of every episode in the library.
    pub async fn episodes_snapshot(&self) -> Vec<Episode> {
        let podcasts = self.podcasts.read().await;
        podcasts
            .iter()
            .flat_map(|p| p.episodes.iter().cloned())
            .collect()
    }

    /// Subscribe to a feed: fetch, normalize, persist, and add to the
    /// snapshot.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::PodcastAlreadyExists`] when the user already
    ///   subscribed to this feed URL
    /// - [`LibraryError::Bridge`] when fetching or parsing the feed fails
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn add_podcast(&self, feed_url: &str) -> Result<PodcastId> {
        if self
            .podcast_repo
            .find_by_feed_url(&self.user, feed_url)
            .await?
            .is_some()
        {
            debug!(feed_url, "Feed already subscribed");
            return Err(LibraryError::PodcastAlreadyExists {
                feed_url: feed_url.to_string(),
            });
        }

        let feed = self.feed_ingest.fetch(feed_url).await?;

        let podcast_id = PodcastId::new();
        let podcast = Podcast {
            id: podcast_id,
            user_id: self.user.clone(),
            title: feed.title,
            description: feed.description,
            image_url: feed.image_url,
            author: feed.author,
            feed_url: feed_url.to_string(),
            created_at: self.clock.unix_timestamp_millis(),
            episodes: feed
                .episodes
                .into_iter()
                .map(|ep| Episode {
                    id: EpisodeId::new(),
                    podcast_id,
                    title: ep.title,
                    description: ep.description,
                    audio_url: ep.audio_url,
                    image_url: ep.image_url,
                    pub_date: ep.pub_date,
                    duration_secs: ep.duration_secs,
                    progress: 0.0,
                    played: false,
                    last_played: None,
                })
                .collect(),
        };

        self.podcast_repo.insert(&podcast).await?;

        info!(
            podcast_id = %podcast.id,
            title = %podcast.title,
            episode_count = podcast.episodes.len(),
            "Podcast added"
        );
        self.events
            .emit(CoreEvent::Library(LibraryEvent::PodcastAdded {
                podcast_id: podcast.id.to_string(),
                title: podcast.title.clone(),
                episode_count: podcast.episodes.len(),
            }))
            .ok();

        // Newest subscription goes first, matching load_all ordering.
        self.podcasts.write().await.insert(0, podcast);

        Ok(podcast_id)
    }

    /// Remove a podcast and everything hanging off it.
    #[instrument(skip(self), fields(user = %self.user, podcast_id = %podcast_id))]
    pub async fn remove_podcast(&self, podcast_id: PodcastId) -> Result<()> {
        if !self.podcast_repo.delete(&self.user, podcast_id).await? {
            return Err(LibraryError::NotFound {
                entity_type: "podcast".to_string(),
                id: podcast_id.to_string(),
            });
        }

        self.podcasts.write().await.retain(|p| p.id != podcast_id);

        info!("Podcast removed");
        self.events
            .emit(CoreEvent::Library(LibraryEvent::PodcastRemoved {
                podcast_id: podcast_id.to_string(),
            }))
            .ok();

        Ok(())
    }

    /// Persist a playback checkpoint and mirror it into the snapshot.
    #[instrument(skip(self, state), fields(episode_id = %episode_id))]
    pub async fn apply_episode_state(
        &self,
        episode_id: EpisodeId,
        state: &EpisodeStateUpdate,
    ) -> Result<()> {
        self.episode_repo.save_state(episode_id, state).await?;

        {
            let mut podcasts = self.podcasts.write().await;
            if let Some(episode) = podcasts
                .iter_mut()
                .flat_map(|p| p.episodes.iter_mut())
                .find(|e| e.id == episode_id)
            {
                episode.progress = state.progress;
                episode.played = state.played;
                episode.last_played = Some(state.last_played);
            } else {
                // Durable write succeeded against an episode the snapshot
                // doesn't know; stale snapshot, worth surfacing.
                warn!("Checkpointed episode is missing from the snapshot");
            }
        }

        self.events
            .emit(CoreEvent::Library(LibraryEvent::EpisodeStateChanged {
                episode_id: episode_id.to_string(),
                progress: state.progress,
                played: state.played,
            }))
            .ok();

        Ok(())
    }

    /// Update an episode's progress in the snapshot only.
    ///
    /// Position ticks land here immediately; the durable write for the same
    /// tick arrives later (or not at all) through [`apply_episode_state`].
    /// Per-tick notification goes out as a playback event, not a library
    /// event, so nothing is emitted here.
    ///
    /// [`apply_episode_state`]: LibraryService::apply_episode_state
    pub async fn touch_episode_progress(
        &self,
        episode_id: EpisodeId,
        progress: f64,
        last_played: i64,
    ) {
        let mut podcasts = self.podcasts.write().await;
        if let Some(episode) = podcasts
            .iter_mut()
            .flat_map(|p| p.episodes.iter_mut())
            .find(|e| e.id == episode_id)
        {
            episode.progress = progress.clamp(0.0, 1.0);
            episode.played = true;
            episode.last_played = Some(last_played);
        }
    }

    /// Mark an episode played without touching its progress.
    ///
    /// Selection counts as listening: the episode becomes part of play
    /// history the moment it is opened.
    #[instrument(skip(self), fields(episode_id = %episode_id))]
    pub async fn mark_played(&self, episode_id: EpisodeId) -> Result<()> {
        let now = self.clock.unix_timestamp_millis();
        self.episode_repo.mark_played(episode_id, now).await?;

        let progress = {
            let mut podcasts = self.podcasts.write().await;
            match podcasts
                .iter_mut()
                .flat_map(|p| p.episodes.iter_mut())
                .find(|e| e.id == episode_id)
            {
                Some(episode) => {
                    episode.played = true;
                    episode.last_played = Some(now);
                    episode.progress
                }
                None => {
                    warn!("Played episode is missing from the snapshot");
                    0.0
                }
            }
        };

        self.events
            .emit(CoreEvent::Library(LibraryEvent::EpisodeStateChanged {
                episode_id: episode_id.to_string(),
                progress,
                played: true,
            }))
            .ok();

        Ok(())
    }

    /// Wipe the user's library. Episodes and bookmarks go with their
    /// podcasts by cascade.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn clear_all(&self) -> Result<()> {
        self.podcast_repo.delete_all(&self.user).await?;
        self.podcasts.write().await.clear();
        info!("Library cleared");
        Ok(())
    }

    /// The user this library belongs to.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Stamp a new bookmark for an episode in this library.
    ///
    /// Pure construction; persistence is the caller's concern.
    pub fn new_bookmark(
        &self,
        episode_id: EpisodeId,
        timestamp_secs: f64,
        note: Option<String>,
    ) -> Bookmark {
        Bookmark {
            id: crate::models::BookmarkId::new(),
            user_id: self.user.clone(),
            episode_id,
            timestamp_secs,
            note,
            created_at: self.clock.unix_timestamp_millis(),
        }
    }
}
