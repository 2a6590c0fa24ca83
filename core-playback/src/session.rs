//! # Player Session
//!
//! The single serialization point for playback. One [`PlayerSession`] exists
//! per user session; every mutation (transport controls, source callbacks,
//! the force-pause signal) goes through the one internal mutex, which is what
//! makes "at most one playing stream" and "no torn transitions" hold.
//!
//! Source callbacks are a per-source drain task: spawned when a source is
//! opened, aborted when it is detached. A preempted source can therefore
//! never deliver a late event into the session, because its task is gone
//! before the next source is opened.

use crate::checkpoint::CheckpointWriter;
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::transport::{PlaybackMode, Transport, TransportAction};
use bridge_traits::audio::{AudioBackend, SourceEvent, SourceHandle};
use bridge_traits::settings::SettingsStore;
use bridge_traits::time::Clock;
use core_library::models::EpisodeId;
use core_library::service::LibraryService;
use core_runtime::events::{CoreEvent, EventBus, PauseSignalBus, PlaybackEvent};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Settings key for the persisted playback speed.
pub const PLAYBACK_SPEED_KEY: &str = "playback_speed";

/// Where to put the playhead once the source reports ready.
#[derive(Debug, Clone, Copy)]
enum PendingSeek {
    /// Resume position as a fraction of the (then-known) duration.
    Fraction(f64),
    /// Absolute bookmark timestamp in seconds.
    Absolute(f64),
}

struct ActiveSource {
    handle: SourceHandle,
    drain: JoinHandle<()>,
}

struct SessionState {
    transport: Transport,
    source: Option<ActiveSource>,
    position_secs: f64,
    duration_secs: Option<f64>,
    pending_seek: Option<PendingSeek>,
    volume: f32,
    speed: f32,
}

/// Playback session controller.
///
/// Construct with [`PlayerSession::new`]; the session subscribes to the
/// pause signal bus exactly once there.
pub struct PlayerSession {
    backend: Arc<dyn AudioBackend>,
    library: LibraryService,
    settings: Arc<dyn SettingsStore>,
    events: EventBus,
    config: PlaybackConfig,
    checkpoints: CheckpointWriter,
    state: Mutex<SessionState>,
    self_ref: Weak<PlayerSession>,
}

impl PlayerSession {
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        backend: Arc<dyn AudioBackend>,
        library: LibraryService,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        pause_signals: &PauseSignalBus,
        config: PlaybackConfig,
    ) -> Arc<Self> {
        // Speed is a local preference; absence means normal speed.
        let speed = settings
            .get_f64(PLAYBACK_SPEED_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or(1.0) as f32;

        let checkpoints =
            CheckpointWriter::new(library.clone(), clock, config.checkpoint_interval);
        let initial_volume = config.initial_volume;

        let session = Arc::new_cyclic(|weak| Self {
            backend,
            library,
            settings,
            events,
            config,
            checkpoints,
            state: Mutex::new(SessionState {
                transport: Transport::Idle,
                source: None,
                position_secs: 0.0,
                duration_secs: None,
                pending_seek: None,
                volume: initial_volume,
                speed,
            }),
            self_ref: weak.clone(),
        });

        Self::spawn_pause_listener(&session, pause_signals);
        session
    }

    /// Start (or resume) playback of an episode.
    ///
    /// Selecting the episode that is already playing is a no-op; selecting
    /// the one currently paused resumes it in place. Anything else preempts
    /// the current source: its progress is flushed, its drain task aborted,
    /// its handle closed, and the new source is opened and played from the
    /// saved resume position once it reports ready.
    #[instrument(skip(self), fields(episode_id = %episode_id))]
    pub async fn play(&self, episode_id: EpisodeId) -> Result<()> {
        let mut state = self.state.lock().await;

        match state.transport {
            Transport::Playing {
                episode_id: current,
                mode: PlaybackMode::Normal,
            } if current == episode_id => return Ok(()),
            Transport::Paused {
                episode_id: current,
                mode: PlaybackMode::Normal,
            } if current == episode_id => {
                return self.resume_locked(&mut state).await;
            }
            _ => {}
        }

        let episode = self.library.find_episode(episode_id).await.ok_or_else(|| {
            PlaybackError::EpisodeNotFound {
                id: episode_id.to_string(),
            }
        })?;

        self.switch_out(&mut state).await;

        state.transport = state.transport.apply(TransportAction::Load {
            episode_id,
            mode: PlaybackMode::Normal,
        })?;
        state.position_secs = 0.0;
        state.duration_secs = episode.duration_secs;
        state.pending_seek = (episode.progress > 0.0).then_some(PendingSeek::Fraction(episode.progress));

        self.open_source(&mut state, &episode.audio_url, episode_id)
            .await?;
        drop(state);

        // Selection counts as listening; the durable played flag is written
        // immediately, not deferred to the first checkpoint.
        if let Err(e) = self.library.mark_played(episode_id).await {
            warn!(error = %e, "Failed to mark episode played on selection");
        }

        Ok(())
    }

    /// Pause the active source and flush a checkpoint at the current
    /// position. No-op when nothing is playing.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        if !matches!(
            state.transport,
            Transport::Playing { .. } | Transport::Loading { .. }
        ) {
            return Ok(());
        }

        let was_audible = state.transport.is_playing();
        state.transport = state.transport.apply(TransportAction::Pause)?;

        if let Some(source) = &state.source {
            if let Err(e) = self.backend.pause(source.handle).await {
                warn!(error = %e, "Backend pause failed");
            }
        }

        let position = state.position_secs;
        let duration = state.duration_secs;
        let episode_id = state.transport.episode_id();

        // Pause cleared bookmark mode above, so the flush below is always a
        // normal checkpoint at the position the user actually hears. A pause
        // that lands while the source is still loading has heard nothing;
        // writing position zero there would clobber the saved resume point.
        if was_audible {
            if let (Some(episode_id), Some(duration)) = (episode_id, duration) {
                if duration > 0.0 {
                    self.checkpoints
                        .flush_with(episode_id, position / duration)
                        .await;
                }
            } else {
                self.checkpoints.flush().await;
            }
        }

        if let Some(episode_id) = episode_id {
            self.emit(PlaybackEvent::Paused {
                episode_id: episode_id.to_string(),
                position_secs: position,
            });
        }

        Ok(())
    }

    /// Resume the paused source. No-op when nothing is paused.
    pub async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !matches!(state.transport, Transport::Paused { .. }) {
            return Ok(());
        }
        self.resume_locked(&mut state).await
    }

    /// Scrub to a fraction of the episode duration. No-op without an active
    /// source or a known duration.
    pub async fn seek_to_fraction(&self, fraction: f64) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(duration) = state.duration_secs else {
            return Ok(());
        };
        let position = (fraction.clamp(0.0, 1.0)) * duration;
        self.seek_locked(&mut state, position).await
    }

    /// Jump forward by the configured delta (30 s default).
    pub async fn skip_forward(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let target = state.position_secs + self.config.skip_forward_secs;
        self.seek_locked(&mut state, target).await
    }

    /// Jump backward by the configured delta (15 s default).
    pub async fn skip_backward(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let target = state.position_secs - self.config.skip_backward_secs;
        self.seek_locked(&mut state, target).await
    }

    /// Set volume, normalized to `0.0..=1.0`, applied to the live source.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        let mut state = self.state.lock().await;
        state.volume = volume.clamp(0.0, 1.0);
        if let Some(source) = &state.source {
            self.backend.set_volume(source.handle, state.volume).await?;
        }
        Ok(())
    }

    /// Set playback speed, applied to the live source and persisted as a
    /// local preference.
    pub async fn set_speed(&self, speed: f32) -> Result<()> {
        let mut state = self.state.lock().await;
        state.speed = speed;
        if let Some(source) = &state.source {
            self.backend.set_rate(source.handle, speed).await?;
        }
        drop(state);

        self.settings
            .set_f64(PLAYBACK_SPEED_KEY, speed as f64)
            .await?;
        Ok(())
    }

    /// Play an episode from an absolute timestamp in bookmark mode.
    ///
    /// While the mode is active, position ticks never reach the checkpoint
    /// writer; the episode's saved resume position stays what it was before
    /// the jump until an ordinary transport action clears the mode.
    #[instrument(skip(self), fields(episode_id = %episode_id, timestamp_secs))]
    pub async fn play_from_timestamp(
        &self,
        episode_id: EpisodeId,
        timestamp_secs: f64,
    ) -> Result<()> {
        let mut state = self.state.lock().await;

        let episode = self.library.find_episode(episode_id).await.ok_or_else(|| {
            PlaybackError::EpisodeNotFound {
                id: episode_id.to_string(),
            }
        })?;

        self.switch_out(&mut state).await;

        let timestamp = timestamp_secs.max(0.0);
        state.transport = state.transport.apply(TransportAction::Load {
            episode_id,
            mode: PlaybackMode::Bookmark,
        })?;
        state.position_secs = timestamp;
        state.duration_secs = episode.duration_secs;
        state.pending_seek = Some(PendingSeek::Absolute(timestamp));

        self.open_source(&mut state, &episode.audio_url, episode_id)
            .await
    }

    /// Stop playback entirely, flushing progress for a normal-mode source.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.switch_out(&mut state).await;
        state.transport = state.transport.apply(TransportAction::Stop)?;
        state.position_secs = 0.0;
        state.duration_secs = None;
        Ok(())
    }

    /// Stop playback and wipe the user's library.
    ///
    /// No checkpoint is written; the row it would land in is going away.
    #[instrument(skip(self))]
    pub async fn clear_all_data(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.checkpoints.clear().await;
        self.detach(&mut state).await;
        state.transport = state.transport.apply(TransportAction::Stop)?;
        state.position_secs = 0.0;
        state.duration_secs = None;
        drop(state);

        self.library.clear_all().await?;
        info!("All user data cleared");
        Ok(())
    }

    /// Current transport state.
    pub async fn transport(&self) -> Transport {
        self.state.lock().await.transport
    }

    /// Current playhead position in seconds.
    pub async fn position_secs(&self) -> f64 {
        self.state.lock().await.position_secs
    }

    /// The episode currently occupying the transport, if any.
    pub async fn current_episode(&self) -> Option<EpisodeId> {
        self.state.lock().await.transport.episode_id()
    }

    pub async fn speed(&self) -> f32 {
        self.state.lock().await.speed
    }

    pub async fn volume(&self) -> f32 {
        self.state.lock().await.volume
    }

    // ------------------------------------------------------------------
    // Internals. All take the state lock already held by the public entry
    // point; none of them lock it themselves.
    // ------------------------------------------------------------------

    async fn resume_locked(&self, state: &mut SessionState) -> Result<()> {
        if let Some(source) = &state.source {
            self.backend.play(source.handle).await?;
        }
        state.transport = state.transport.apply(TransportAction::Play)?;

        if let Some(episode_id) = state.transport.episode_id() {
            self.emit(PlaybackEvent::Resumed {
                episode_id: episode_id.to_string(),
            });
        }
        Ok(())
    }

    async fn seek_locked(&self, state: &mut SessionState, position: f64) -> Result<()> {
        let Some(source) = &state.source else {
            return Ok(());
        };

        let position = match state.duration_secs {
            Some(duration) => position.clamp(0.0, duration),
            None => position.max(0.0),
        };

        self.backend.seek(source.handle, position).await?;
        state.position_secs = position;

        if state.transport.checkpoints_enabled() {
            if let (Some(episode_id), Some(duration)) =
                (state.transport.episode_id(), state.duration_secs)
            {
                if duration > 0.0 {
                    self.checkpoints
                        .record_tick(episode_id, position / duration)
                        .await;
                }
            }
        }
        Ok(())
    }

    /// Flush the outgoing source's progress and detach it. Safe to call with
    /// no source attached.
    async fn switch_out(&self, state: &mut SessionState) {
        if state.transport.is_active() && state.transport.mode() == Some(PlaybackMode::Normal) {
            self.checkpoints.flush().await;
        } else {
            self.checkpoints.clear().await;
        }
        self.detach(state).await;
    }

    /// Abort the drain task and close the backend handle. Strictly paired
    /// with `open_source`.
    async fn detach(&self, state: &mut SessionState) {
        if let Some(source) = state.source.take() {
            source.drain.abort();
            if let Err(e) = self.backend.close(source.handle).await {
                warn!(handle = %source.handle, error = %e, "Failed to close source");
            }
        }
        state.pending_seek = None;
    }

    /// Open a source and attach its drain task. On failure the transport
    /// falls back from `Loading` and the error is both returned and emitted.
    async fn open_source(
        &self,
        state: &mut SessionState,
        url: &str,
        episode_id: EpisodeId,
    ) -> Result<()> {
        match self.backend.open(url).await {
            Ok((handle, receiver)) => {
                debug!(%handle, url, "Source opened");
                state.source = Some(ActiveSource {
                    handle,
                    drain: self.spawn_drain(handle, receiver),
                });
                Ok(())
            }
            Err(e) => {
                state.transport = state.transport.apply(TransportAction::Fail)?;
                self.emit(PlaybackEvent::Error {
                    episode_id: Some(episode_id.to_string()),
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn spawn_drain(
        &self,
        handle: SourceHandle,
        mut receiver: mpsc::Receiver<SourceEvent>,
    ) -> JoinHandle<()> {
        let weak = self.self_ref.clone();
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let Some(session) = weak.upgrade() else { break };
                session.handle_source_event(handle, event).await;
            }
        })
    }

    fn spawn_pause_listener(session: &Arc<Self>, bus: &PauseSignalBus) {
        let mut signals = bus.subscribe();
        let weak = Arc::downgrade(session);
        tokio::spawn(async move {
            while signals.recv().await.is_ok() {
                let Some(session) = weak.upgrade() else { break };
                if session.transport().await.is_playing() {
                    if let Err(e) = session.pause().await {
                        warn!(error = %e, "Force-pause failed");
                    }
                }
            }
        });
    }

    async fn handle_source_event(&self, handle: SourceHandle, event: SourceEvent) {
        let mut state = self.state.lock().await;

        // A preempted source's drain task is aborted before a new one is
        // attached, but an event already dequeued can still get here.
        let current = state.source.as_ref().map(|s| s.handle);
        if current != Some(handle) {
            debug!(%handle, "Dropping event from stale source");
            return;
        }

        match event {
            SourceEvent::Ready { duration } => self.on_ready(&mut state, duration).await,
            SourceEvent::Position { position } => self.on_position(&mut state, position).await,
            SourceEvent::Ended => self.on_ended(&mut state).await,
            SourceEvent::Error { message } => self.on_error(&mut state, message).await,
        }
    }

    /// Single readiness path: seek to the pending target (saved resume
    /// position or bookmark timestamp), apply volume/speed, start playing
    /// unless a pause preempted the load.
    async fn on_ready(&self, state: &mut SessionState, duration: Option<f64>) {
        if duration.is_some() {
            state.duration_secs = duration;
        }

        let target = match state.pending_seek.take() {
            Some(PendingSeek::Fraction(progress)) => state
                .duration_secs
                .map(|d| (progress * d).clamp(0.0, d))
                .filter(|p| *p > 0.0),
            Some(PendingSeek::Absolute(timestamp)) => Some(timestamp),
            None => None,
        };

        let Some(source) = state.source.as_ref() else {
            return;
        };
        let handle = source.handle;

        if let Some(position) = target {
            if let Err(e) = self.backend.seek(handle, position).await {
                warn!(error = %e, "Initial seek failed");
            } else {
                state.position_secs = position;
            }
        }

        if let Err(e) = self.backend.set_volume(handle, state.volume).await {
            warn!(error = %e, "Failed to apply volume");
        }
        if state.speed != 1.0 {
            if let Err(e) = self.backend.set_rate(handle, state.speed).await {
                warn!(error = %e, "Failed to apply playback speed");
            }
        }

        // A pause may have landed while the source was still loading; the
        // playhead is positioned, but starting is left to resume().
        if !matches!(state.transport, Transport::Loading { .. }) {
            debug!(%handle, "Source ready while not loading; holding paused");
            return;
        }

        if let Err(e) = self.backend.play(handle).await {
            let episode_id = state.transport.episode_id();
            self.fail_source(state, &e.to_string()).await;
            self.emit(PlaybackEvent::Error {
                episode_id: episode_id.map(|id| id.to_string()),
                message: e.to_string(),
            });
            return;
        }

        match state.transport.apply(TransportAction::SourceReady) {
            Ok(next) => state.transport = next,
            Err(e) => {
                warn!(error = %e, "Readiness in unexpected transport state");
                return;
            }
        }

        if let Some(episode_id) = state.transport.episode_id() {
            let from_bookmark = state.transport.mode() == Some(PlaybackMode::Bookmark);
            info!(%episode_id, from_bookmark, "Playback started");
            self.emit(PlaybackEvent::Started {
                episode_id: episode_id.to_string(),
                from_bookmark,
            });
        }
    }

    async fn on_position(&self, state: &mut SessionState, position: f64) {
        state.position_secs = position;

        let Some(episode_id) = state.transport.episode_id() else {
            return;
        };

        self.emit(PlaybackEvent::PositionChanged {
            episode_id: episode_id.to_string(),
            position_secs: position,
            duration_secs: state.duration_secs,
        });

        if state.transport.checkpoints_enabled() {
            if let Some(duration) = state.duration_secs {
                if duration > 0.0 {
                    self.checkpoints
                        .record_tick(episode_id, position / duration)
                        .await;
                }
            }
        }
    }

    /// Natural end: completion is durable exactly once, then the source is
    /// released and the transport rests at `Idle`.
    async fn on_ended(&self, state: &mut SessionState) {
        let Some(episode_id) = state.transport.episode_id() else {
            return;
        };

        match state.transport.apply(TransportAction::End) {
            Ok(next) => state.transport = next,
            Err(e) => {
                warn!(error = %e, "Ended event in unexpected transport state");
                return;
            }
        }

        self.checkpoints.flush_with(episode_id, 1.0).await;

        info!(%episode_id, "Episode completed");
        self.emit(PlaybackEvent::Completed {
            episode_id: episode_id.to_string(),
        });

        // We are on the drain task itself; dropping the JoinHandle (not
        // aborting) lets this handler finish, and the loop exits once the
        // backend closes the channel.
        if let Some(source) = state.source.take() {
            drop(source.drain);
            if let Err(e) = self.backend.close(source.handle).await {
                warn!(handle = %source.handle, error = %e, "Failed to close ended source");
            }
        }

        state.transport = Transport::Idle;
        state.position_secs = 0.0;
        state.duration_secs = None;
        state.pending_seek = None;
    }

    async fn on_error(&self, state: &mut SessionState, message: String) {
        let episode_id = state.transport.episode_id();
        warn!(?episode_id, message, "Source reported an error");
        self.fail_source(state, &message).await;

        self.emit(PlaybackEvent::Error {
            episode_id: episode_id.map(|id| id.to_string()),
            message,
        });
    }

    /// Recoverable failure: fall back from the active state, releasing the
    /// source only when there is nothing to hold a position for.
    async fn fail_source(&self, state: &mut SessionState, message: &str) {
        let was_loading = matches!(state.transport, Transport::Loading { .. });

        match state.transport.apply(TransportAction::Fail) {
            Ok(next) => state.transport = next,
            Err(e) => {
                warn!(error = %e, message, "Failure in unexpected transport state");
                return;
            }
        }

        if was_loading {
            if let Some(source) = state.source.take() {
                drop(source.drain);
                if let Err(e) = self.backend.close(source.handle).await {
                    warn!(handle = %source.handle, error = %e, "Failed to close failed source");
                }
            }
            state.pending_seek = None;
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine; events are observability, not control flow.
        self.events.emit(CoreEvent::Playback(event)).ok();
    }
}
