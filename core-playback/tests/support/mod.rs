//! Shared fixtures: a scripted audio backend, recording repositories, and a
//! harness wiring a session against an in-memory library.
#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::audio::{AudioBackend, SourceEvent, SourceHandle};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::feed::{FeedIngest, ParsedFeed};
use bridge_traits::settings::MemorySettingsStore;
use bridge_traits::time::ManualClock;
use core_library::error::{LibraryError, Result as LibraryResult};
use core_library::models::{
    Bookmark, BookmarkId, Episode, EpisodeId, EpisodeStateUpdate, Podcast, PodcastId, UserId,
};
use core_library::repositories::{
    BookmarkRepository, EpisodeStateRepository, PodcastRepository,
};
use core_library::service::LibraryService;
use core_playback::config::PlaybackConfig;
use core_playback::session::PlayerSession;
use core_runtime::events::{CoreEvent, EventBus, PauseSignalBus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

pub const T0_MILLIS: i64 = 1_700_000_000_000;

// ---------------------------------------------------------------------------
// Scripted audio backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Open(String),
    Play(SourceHandle),
    Pause(SourceHandle),
    Seek(SourceHandle, f64),
    SetVolume(SourceHandle, f32),
    SetRate(SourceHandle, f32),
    Close(SourceHandle),
}

struct FakeSource {
    sender: mpsc::Sender<SourceEvent>,
    position: f64,
    closed: bool,
}

#[derive(Default)]
struct BackendInner {
    sources: HashMap<SourceHandle, FakeSource>,
    handles_in_order: Vec<SourceHandle>,
    calls: Vec<BackendCall>,
    fail_next_open: Option<String>,
}

/// Test backend: records every control call and lets the test script the
/// source's event stream.
#[derive(Default)]
pub struct FakeAudioBackend {
    inner: Mutex<BackendInner>,
}

impl FakeAudioBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_open(&self, message: &str) {
        self.inner.lock().unwrap().fail_next_open = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn open_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Open(_)))
            .count()
    }

    /// The most recently opened handle.
    pub fn last_handle(&self) -> SourceHandle {
        *self
            .inner
            .lock()
            .unwrap()
            .handles_in_order
            .last()
            .expect("no source opened")
    }

    /// Deliver a source event to whoever is draining this handle's channel.
    /// Silently dropped for closed handles, like a real backend after close.
    pub async fn emit(&self, handle: SourceHandle, event: SourceEvent) {
        let sender = {
            let inner = self.inner.lock().unwrap();
            inner
                .sources
                .get(&handle)
                .filter(|s| !s.closed)
                .map(|s| s.sender.clone())
        };
        if let Some(sender) = sender {
            sender.send(event).await.ok();
        }
    }

    fn check_handle(inner: &BackendInner, handle: SourceHandle) -> BridgeResult<()> {
        match inner.sources.get(&handle) {
            Some(source) if !source.closed => Ok(()),
            _ => Err(BridgeError::UnknownHandle(handle.to_string())),
        }
    }
}

#[async_trait]
impl AudioBackend for FakeAudioBackend {
    async fn open(&self, url: &str) -> BridgeResult<(SourceHandle, mpsc::Receiver<SourceEvent>)> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.fail_next_open.take() {
            inner.calls.push(BackendCall::Open(url.to_string()));
            return Err(BridgeError::OperationFailed(message));
        }

        let handle = SourceHandle::new();
        let (sender, receiver) = mpsc::channel(64);
        inner.sources.insert(
            handle,
            FakeSource {
                sender,
                position: 0.0,
                closed: false,
            },
        );
        inner.handles_in_order.push(handle);
        inner.calls.push(BackendCall::Open(url.to_string()));
        Ok((handle, receiver))
    }

    async fn play(&self, handle: SourceHandle) -> BridgeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_handle(&inner, handle)?;
        inner.calls.push(BackendCall::Play(handle));
        Ok(())
    }

    async fn pause(&self, handle: SourceHandle) -> BridgeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_handle(&inner, handle)?;
        inner.calls.push(BackendCall::Pause(handle));
        Ok(())
    }

    async fn seek(&self, handle: SourceHandle, position: f64) -> BridgeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_handle(&inner, handle)?;
        if let Some(source) = inner.sources.get_mut(&handle) {
            source.position = position;
        }
        inner.calls.push(BackendCall::Seek(handle, position));
        Ok(())
    }

    async fn set_volume(&self, handle: SourceHandle, volume: f32) -> BridgeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_handle(&inner, handle)?;
        inner.calls.push(BackendCall::SetVolume(handle, volume));
        Ok(())
    }

    async fn set_rate(&self, handle: SourceHandle, rate: f32) -> BridgeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_handle(&inner, handle)?;
        inner.calls.push(BackendCall::SetRate(handle, rate));
        Ok(())
    }

    async fn position(&self, handle: SourceHandle) -> BridgeResult<f64> {
        let inner = self.inner.lock().unwrap();
        Self::check_handle(&inner, handle)?;
        Ok(inner.sources[&handle].position)
    }

    async fn close(&self, handle: SourceHandle) -> BridgeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_handle(&inner, handle)?;
        if let Some(source) = inner.sources.get_mut(&handle) {
            source.closed = true;
        }
        inner.calls.push(BackendCall::Close(handle));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

/// Podcast repository over a plain Vec; single-user tests ignore scoping.
#[derive(Default)]
pub struct StaticPodcastRepo {
    podcasts: Mutex<Vec<Podcast>>,
}

impl StaticPodcastRepo {
    pub fn seeded(podcasts: Vec<Podcast>) -> Arc<Self> {
        Arc::new(Self {
            podcasts: Mutex::new(podcasts),
        })
    }
}

#[async_trait]
impl PodcastRepository for StaticPodcastRepo {
    async fn load_all(&self, _user: &UserId) -> LibraryResult<Vec<Podcast>> {
        Ok(self.podcasts.lock().unwrap().clone())
    }

    async fn find_by_feed_url(
        &self,
        _user: &UserId,
        feed_url: &str,
    ) -> LibraryResult<Option<PodcastId>> {
        Ok(self
            .podcasts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.feed_url == feed_url)
            .map(|p| p.id))
    }

    async fn insert(&self, podcast: &Podcast) -> LibraryResult<()> {
        self.podcasts.lock().unwrap().insert(0, podcast.clone());
        Ok(())
    }

    async fn delete(&self, _user: &UserId, id: PodcastId) -> LibraryResult<bool> {
        let mut podcasts = self.podcasts.lock().unwrap();
        let before = podcasts.len();
        podcasts.retain(|p| p.id != id);
        Ok(podcasts.len() != before)
    }

    async fn delete_all(&self, _user: &UserId) -> LibraryResult<()> {
        self.podcasts.lock().unwrap().clear();
        Ok(())
    }
}

/// Episode-state repository that records every durable write.
#[derive(Default)]
pub struct RecordingEpisodeRepo {
    saves: Mutex<Vec<(EpisodeId, EpisodeStateUpdate)>>,
    played: Mutex<Vec<(EpisodeId, i64)>>,
    fail_saves: AtomicBool,
}

impl RecordingEpisodeRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saves(&self) -> Vec<(EpisodeId, EpisodeStateUpdate)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn played_marks(&self) -> Vec<(EpisodeId, i64)> {
        self.played.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EpisodeStateRepository for RecordingEpisodeRepo {
    async fn save_state(
        &self,
        episode_id: EpisodeId,
        state: &EpisodeStateUpdate,
    ) -> LibraryResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LibraryError::InvalidInput {
                field: "episode_state".to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.saves.lock().unwrap().push((episode_id, state.clone()));
        Ok(())
    }

    async fn mark_played(&self, episode_id: EpisodeId, last_played: i64) -> LibraryResult<()> {
        self.played.lock().unwrap().push((episode_id, last_played));
        Ok(())
    }

    async fn load_state(
        &self,
        episode_id: EpisodeId,
    ) -> LibraryResult<Option<EpisodeStateUpdate>> {
        Ok(self
            .saves
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| *id == episode_id)
            .map(|(_, state)| state.clone()))
    }
}

/// Bookmark repository over a plain Vec, newest-first like the real one.
#[derive(Default)]
pub struct MemoryBookmarkRepo {
    bookmarks: Mutex<Vec<Bookmark>>,
}

impl MemoryBookmarkRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stored(&self) -> Vec<Bookmark> {
        self.bookmarks.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookmarkRepository for MemoryBookmarkRepo {
    async fn load_all(&self, _user: &UserId) -> LibraryResult<Vec<Bookmark>> {
        Ok(self.stored())
    }

    async fn insert(&self, bookmark: &Bookmark) -> LibraryResult<()> {
        self.bookmarks.lock().unwrap().insert(0, bookmark.clone());
        Ok(())
    }

    async fn update_note(
        &self,
        _user: &UserId,
        id: BookmarkId,
        note: Option<&str>,
    ) -> LibraryResult<bool> {
        let mut bookmarks = self.bookmarks.lock().unwrap();
        match bookmarks.iter_mut().find(|b| b.id == id) {
            Some(bookmark) => {
                bookmark.note = note.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, _user: &UserId, id: BookmarkId) -> LibraryResult<bool> {
        let mut bookmarks = self.bookmarks.lock().unwrap();
        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != id);
        Ok(bookmarks.len() != before)
    }

    async fn delete_all(&self, _user: &UserId) -> LibraryResult<()> {
        self.bookmarks.lock().unwrap().clear();
        Ok(())
    }
}

/// Feed ingester for tests that never add podcasts.
pub struct NullFeed;

#[async_trait]
impl FeedIngest for NullFeed {
    async fn fetch(&self, _feed_url: &str) -> BridgeResult<ParsedFeed> {
        Err(BridgeError::NotAvailable("no feed ingestion".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn episode(
    podcast_id: PodcastId,
    duration_secs: Option<f64>,
    progress: f64,
    played: bool,
    last_played: Option<i64>,
) -> Episode {
    Episode {
        id: EpisodeId::new(),
        podcast_id,
        title: "Episode".to_string(),
        description: String::new(),
        audio_url: "https://example.com/audio.mp3".to_string(),
        image_url: None,
        pub_date: Some("2024-01-01".to_string()),
        duration_secs,
        progress,
        played,
        last_played,
    }
}

pub fn podcast_with(episodes: Vec<Episode>) -> Podcast {
    let id = episodes
        .first()
        .map(|e| e.podcast_id)
        .unwrap_or_default();
    Podcast {
        id,
        user_id: UserId::new("user-1"),
        title: "Cast".to_string(),
        description: String::new(),
        image_url: None,
        author: None,
        feed_url: "https://example.com/feed.xml".to_string(),
        created_at: 0,
        episodes,
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub backend: Arc<FakeAudioBackend>,
    pub library: LibraryService,
    pub session: Arc<PlayerSession>,
    pub episode_repo: Arc<RecordingEpisodeRepo>,
    pub bookmark_repo: Arc<MemoryBookmarkRepo>,
    pub settings: Arc<MemorySettingsStore>,
    pub clock: Arc<ManualClock>,
    pub events: EventBus,
    pub pause_bus: PauseSignalBus,
}

impl Harness {
    pub async fn with_podcasts(podcasts: Vec<Podcast>) -> Self {
        Self::with_podcasts_and_config(podcasts, PlaybackConfig::default()).await
    }

    pub async fn with_podcasts_and_config(podcasts: Vec<Podcast>, config: PlaybackConfig) -> Self {
        let backend = FakeAudioBackend::new();
        let episode_repo = RecordingEpisodeRepo::new();
        let bookmark_repo = MemoryBookmarkRepo::new();
        let settings = Arc::new(MemorySettingsStore::new());
        let clock = Arc::new(ManualClock::at(T0_MILLIS));
        let events = EventBus::default();
        let pause_bus = PauseSignalBus::default();

        let library = LibraryService::new(
            StaticPodcastRepo::seeded(podcasts),
            episode_repo.clone(),
            Arc::new(NullFeed),
            clock.clone(),
            events.clone(),
            UserId::new("user-1"),
        );
        library.load().await.unwrap();

        let session = PlayerSession::new(
            backend.clone(),
            library.clone(),
            settings.clone(),
            clock.clone(),
            events.clone(),
            &pause_bus,
            config,
        )
        .await;

        Self {
            backend,
            library,
            session,
            episode_repo,
            bookmark_repo,
            settings,
            clock,
            events,
            pause_bus,
        }
    }

    /// Drive a source to the playing state: deliver readiness and wait for
    /// the drain task to process it.
    pub async fn make_ready(&self, duration: Option<f64>) {
        let handle = self.backend.last_handle();
        self.backend
            .emit(handle, SourceEvent::Ready { duration })
            .await;
        settle().await;
    }

    pub async fn tick(&self, position: f64) {
        let handle = self.backend.last_handle();
        self.backend
            .emit(handle, SourceEvent::Position { position })
            .await;
        settle().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }
}

/// Let spawned tasks (source drains, checkpoint timers) run. Under a paused
/// runtime clock this advances virtual time by 1 ms once everything is idle.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}
