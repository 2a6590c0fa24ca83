//! # Bookmark Manager
//!
//! Timestamp+note snapshots, independent of the progress checkpoints. The
//! position is captured synchronously the moment a bookmark is requested, so
//! a slow note dialog cannot shift it; the draft flow additionally pauses
//! playback while the note is composed and restores it afterwards.

use crate::error::{PlaybackError, Result};
use crate::session::PlayerSession;
use core_library::models::{Bookmark, BookmarkId, EpisodeId};
use core_library::repositories::BookmarkRepository;
use core_library::service::LibraryService;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// A bookmark being composed: position and transport state captured at the
/// moment the dialog opened.
#[derive(Debug, Clone, Copy)]
struct Draft {
    episode_id: EpisodeId,
    timestamp_secs: f64,
    resume_after: bool,
}

struct BookmarkState {
    /// Newest-first, matching the repository ordering.
    bookmarks: Vec<Bookmark>,
    draft: Option<Draft>,
}

/// Bookmark capture, editing, and bookmark-mode playback.
pub struct BookmarkManager {
    repo: Arc<dyn BookmarkRepository>,
    library: LibraryService,
    session: Arc<PlayerSession>,
    events: EventBus,
    state: Mutex<BookmarkState>,
}

impl BookmarkManager {
    pub fn new(
        repo: Arc<dyn BookmarkRepository>,
        library: LibraryService,
        session: Arc<PlayerSession>,
        events: EventBus,
    ) -> Self {
        Self {
            repo,
            library,
            session,
            events,
            state: Mutex::new(BookmarkState {
                bookmarks: Vec::new(),
                draft: None,
            }),
        }
    }

    /// Load the user's bookmarks from the durable store.
    pub async fn load(&self) -> Result<()> {
        let bookmarks = self.repo.load_all(self.library.user()).await?;
        info!(bookmark_count = bookmarks.len(), "Bookmarks loaded");
        self.state.lock().await.bookmarks = bookmarks;
        Ok(())
    }

    /// All bookmarks, newest-first.
    pub async fn all(&self) -> Vec<Bookmark> {
        self.state.lock().await.bookmarks.clone()
    }

    /// Bookmarks for one episode, newest-first.
    pub async fn bookmarks_for(&self, episode_id: EpisodeId) -> Vec<Bookmark> {
        self.state
            .lock()
            .await
            .bookmarks
            .iter()
            .filter(|b| b.episode_id == episode_id)
            .cloned()
            .collect()
    }

    /// Capture a bookmark at the current playhead position, or at an
    /// explicit timestamp when one is given.
    ///
    /// Returns `Ok(None)` when no episode is active. The position is read
    /// before anything else happens, so the timestamp reflects the moment of
    /// the call.
    #[instrument(skip(self, note))]
    pub async fn add_bookmark(
        &self,
        note: Option<String>,
        timestamp_override: Option<f64>,
    ) -> Result<Option<Bookmark>> {
        let Some(episode_id) = self.session.current_episode().await else {
            return Ok(None);
        };
        let timestamp_secs = match timestamp_override {
            Some(t) => t.max(0.0),
            None => self.session.position_secs().await,
        };

        Ok(Some(self.store(episode_id, timestamp_secs, note).await))
    }

    /// Open a bookmark draft: capture the position, pause if playing.
    ///
    /// Returns the captured timestamp, or `None` when no episode is active.
    pub async fn begin_draft(&self) -> Result<Option<f64>> {
        let Some(episode_id) = self.session.current_episode().await else {
            return Ok(None);
        };
        let timestamp_secs = self.session.position_secs().await;
        let was_playing = self.session.transport().await.is_playing();

        if was_playing {
            self.session.pause().await?;
        }

        self.state.lock().await.draft = Some(Draft {
            episode_id,
            timestamp_secs,
            resume_after: was_playing,
        });

        Ok(Some(timestamp_secs))
    }

    /// Commit the open draft with its note, restoring playback if the draft
    /// paused it. Returns `Ok(None)` when no draft is open.
    pub async fn commit_draft(&self, note: Option<String>) -> Result<Option<Bookmark>> {
        let Some(draft) = self.state.lock().await.draft.take() else {
            return Ok(None);
        };

        let bookmark = self
            .store(draft.episode_id, draft.timestamp_secs, note)
            .await;

        if draft.resume_after {
            self.session.resume().await?;
        }

        Ok(Some(bookmark))
    }

    /// Discard the open draft, restoring playback if the draft paused it.
    pub async fn cancel_draft(&self) -> Result<()> {
        let Some(draft) = self.state.lock().await.draft.take() else {
            return Ok(());
        };

        if draft.resume_after {
            self.session.resume().await?;
        }
        Ok(())
    }

    /// Replace a bookmark's note. Returns `false` for an unknown id.
    pub async fn edit_note(&self, id: BookmarkId, note: Option<String>) -> Result<bool> {
        let found = {
            let mut state = self.state.lock().await;
            match state.bookmarks.iter_mut().find(|b| b.id == id) {
                Some(bookmark) => {
                    bookmark.note = note.clone();
                    true
                }
                None => false,
            }
        };

        if !found {
            return Ok(false);
        }

        if let Err(e) = self
            .repo
            .update_note(self.library.user(), id, note.as_deref())
            .await
        {
            warn!(bookmark_id = %id, error = %e, "Bookmark note update failed");
        }

        self.emit(LibraryEvent::BookmarkUpdated {
            bookmark_id: id.to_string(),
        });
        Ok(true)
    }

    /// Delete a bookmark. Returns `false` for an unknown id.
    pub async fn remove(&self, id: BookmarkId) -> Result<bool> {
        let found = {
            let mut state = self.state.lock().await;
            let before = state.bookmarks.len();
            state.bookmarks.retain(|b| b.id != id);
            state.bookmarks.len() != before
        };

        if !found {
            return Ok(false);
        }

        if let Err(e) = self.repo.delete(self.library.user(), id).await {
            warn!(bookmark_id = %id, error = %e, "Bookmark delete failed");
        }

        self.emit(LibraryEvent::BookmarkRemoved {
            bookmark_id: id.to_string(),
        });
        Ok(true)
    }

    /// Jump to a bookmark: start its episode in bookmark mode at the saved
    /// timestamp.
    #[instrument(skip(self), fields(bookmark_id = %id))]
    pub async fn play_from(&self, id: BookmarkId) -> Result<()> {
        let bookmark = {
            let state = self.state.lock().await;
            state
                .bookmarks
                .iter()
                .find(|b| b.id == id)
                .cloned()
                .ok_or(PlaybackError::BookmarkNotFound { id: id.to_string() })?
        };

        self.session
            .play_from_timestamp(bookmark.episode_id, bookmark.timestamp_secs)
            .await
    }

    /// In-memory insert first; the durable write is best-effort.
    async fn store(
        &self,
        episode_id: EpisodeId,
        timestamp_secs: f64,
        note: Option<String>,
    ) -> Bookmark {
        let bookmark = self.library.new_bookmark(episode_id, timestamp_secs, note);

        self.state
            .lock()
            .await
            .bookmarks
            .insert(0, bookmark.clone());

        if let Err(e) = self.repo.insert(&bookmark).await {
            warn!(bookmark_id = %bookmark.id, error = %e, "Bookmark write failed");
        }

        info!(
            bookmark_id = %bookmark.id,
            episode_id = %episode_id,
            timestamp_secs,
            "Bookmark added"
        );
        self.emit(LibraryEvent::BookmarkAdded {
            bookmark_id: bookmark.id.to_string(),
            episode_id: episode_id.to_string(),
            timestamp_secs,
        });

        bookmark
    }

    fn emit(&self, event: LibraryEvent) {
        self.events.emit(CoreEvent::Library(event)).ok();
    }
}
