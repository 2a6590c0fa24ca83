//! # Checkpoint Writer
//!
//! Coalesces high-frequency position ticks into infrequent durable progress
//! writes. In-memory state (the library snapshot) is updated on every tick;
//! the database sees at most one write per episode per debounce window.
//!
//! The debounce is an armed task, not a timestamp comparison: the first tick
//! after a write arms a timer for `last_write + interval`, later ticks only
//! replace the pending value, and the timer fires once with whatever is
//! pending then. Forced flushes (pause, switch-out, natural end, force-pause
//! signal) cancel the timer and write immediately. Timing uses the runtime's
//! monotonic clock; the wall clock only stamps `last_played`.

use bridge_traits::time::Clock;
use core_library::models::{EpisodeId, EpisodeStateUpdate};
use core_library::service::LibraryService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The latest not-yet-durable progress value for the active episode.
#[derive(Debug, Clone, Copy)]
struct Pending {
    episode_id: EpisodeId,
    progress: f64,
}

struct ArmedTimer {
    cancel: CancellationToken,
    // Held so a cancelled timer task is detached, not leaked awaiting.
    _task: JoinHandle<()>,
}

struct WriterState {
    pending: Option<Pending>,
    last_write: Option<Instant>,
    timer: Option<ArmedTimer>,
}

/// Debounced durable-progress writer.
///
/// Cloning is cheap; clones share the same timer and pending state.
#[derive(Clone)]
pub struct CheckpointWriter {
    library: LibraryService,
    clock: Arc<dyn Clock>,
    interval: Duration,
    state: Arc<Mutex<WriterState>>,
}

impl CheckpointWriter {
    pub fn new(library: LibraryService, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            library,
            clock,
            interval,
            state: Arc::new(Mutex::new(WriterState {
                pending: None,
                last_write: None,
                timer: None,
            })),
        }
    }

    /// Record a position tick for the active episode.
    ///
    /// The library snapshot is updated immediately; the durable write is
    /// deferred to the debounce timer. Ticks for a different episode than the
    /// pending one simply replace it; the session flushes on switch-out
    /// before ticks from the next episode arrive.
    pub async fn record_tick(&self, episode_id: EpisodeId, progress: f64) {
        let progress = progress.clamp(0.0, 1.0);

        self.library
            .touch_episode_progress(episode_id, progress, self.clock.unix_timestamp_millis())
            .await;

        let mut state = self.state.lock().await;
        state.pending = Some(Pending {
            episode_id,
            progress,
        });

        if state.timer.is_none() {
            // First tick of a new window. The deadline is fixed at
            // last_write + interval, so later ticks don't need to re-arm.
            let deadline = state
                .last_write
                .map(|t| t + self.interval)
                .unwrap_or_else(Instant::now);
            self.arm(&mut state, deadline);
        }
    }

    /// Write the pending checkpoint now, cancelling any armed timer.
    ///
    /// Used on transport boundaries. Awaited by the caller; write failures
    /// are logged and swallowed, the in-memory state stays authoritative.
    pub async fn flush(&self) {
        let pending = {
            let mut state = self.state.lock().await;
            self.disarm(&mut state);
            state.last_write = Some(Instant::now());
            state.pending.take()
        };

        if let Some(pending) = pending {
            self.write(pending).await;
        }
    }

    /// Write an explicit progress value now, replacing whatever is pending.
    ///
    /// Transport boundaries know the authoritative position (pause, natural
    /// end); ticks may be stale by comparison.
    pub async fn flush_with(&self, episode_id: EpisodeId, progress: f64) {
        {
            let mut state = self.state.lock().await;
            self.disarm(&mut state);
            state.pending = None;
            state.last_write = Some(Instant::now());
        }

        self.write(Pending {
            episode_id,
            progress: progress.clamp(0.0, 1.0),
        })
        .await;
    }

    /// Drop the pending checkpoint without writing it.
    ///
    /// Used when the data the write would land in is being removed.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        self.disarm(&mut state);
        state.pending = None;
    }

    fn arm(&self, state: &mut WriterState, deadline: Instant) {
        let cancel = CancellationToken::new();
        let writer = self.clone();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {
                        writer.fire().await;
                    }
                }
            }
        });

        state.timer = Some(ArmedTimer {
            cancel,
            _task: task,
        });
    }

    fn disarm(&self, state: &mut WriterState) {
        if let Some(timer) = state.timer.take() {
            timer.cancel.cancel();
        }
    }

    /// Timer expiry: write whatever is pending. Fire-and-forget from the
    /// session's point of view.
    async fn fire(&self) {
        let pending = {
            let mut state = self.state.lock().await;
            state.timer = None;
            state.last_write = Some(Instant::now());
            state.pending.take()
        };

        if let Some(pending) = pending {
            self.write(pending).await;
        }
    }

    async fn write(&self, pending: Pending) {
        let update = EpisodeStateUpdate::checkpoint(
            pending.progress,
            true,
            self.clock.unix_timestamp_millis(),
        );

        debug!(
            episode_id = %pending.episode_id,
            progress = update.progress,
            "Writing checkpoint"
        );

        // Not retried; the next tick or flush supersedes a lost write.
        if let Err(e) = self
            .library
            .apply_episode_state(pending.episode_id, &update)
            .await
        {
            warn!(episode_id = %pending.episode_id, error = %e, "Checkpoint write failed");
        }
    }
}
