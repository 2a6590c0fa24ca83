//! # Event Bus System
//!
//! Event-driven notifications for the podcast player core, built on
//! `tokio::sync::broadcast`. Modules emit typed events; any number of
//! subscribers (UI layers, tests, loggers) observe them independently.
//!
//! ## Overview
//!
//! - **Event types**: strongly-typed enums per domain ([`PlaybackEvent`],
//!   [`LibraryEvent`]) wrapped in a top-level [`CoreEvent`]
//! - **[`EventBus`]**: central broadcast channel for publishing events
//! - **[`EventStream`]**: receiver wrapper with optional filtering
//! - **[`PauseSignalBus`]**: a dedicated, payload-free broadcast used to force
//!   the playback session out of the `Playing` state from outside
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, PlaybackEvent};
//!
//! let bus = EventBus::new(100);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Paused {
//!     episode_id: "ep-1".to_string(),
//!     position_secs: 75.0,
//! }))
//! .ok();
//! ```
//!
//! ## Error Handling
//!
//! Subscribers can see two broadcast errors: `RecvError::Lagged(n)` when they
//! fell behind by `n` events (non-fatal, keep receiving) and
//! `RecvError::Closed` when every sender is gone (shutdown). The pause signal
//! bus treats `Lagged` as a received signal, since coalescing payload-free
//! signals loses nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Default buffer size for the pause signal bus. Signals carry no payload and
/// coalesce, so a small buffer suffices.
pub const DEFAULT_PAUSE_SIGNAL_BUFFER_SIZE: usize = 16;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback-session events
    Playback(PlaybackEvent),
    /// Library and bookmark events
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Library(LibraryEvent::PodcastAdded { .. })
            | CoreEvent::Library(LibraryEvent::PodcastRemoved { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback session.
///
/// Identifiers are carried as strings so events stay serializable for host
/// UIs without dragging domain-model types into this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A source finished loading and playback began.
    Started {
        /// The episode now playing.
        episode_id: String,
        /// `true` when this playback was started from a bookmark jump.
        from_bookmark: bool,
    },
    /// Playback paused (user action or force-pause signal).
    Paused {
        episode_id: String,
        /// Position in seconds at the moment of pausing.
        position_secs: f64,
    },
    /// Playback resumed on an already-loaded source.
    Resumed { episode_id: String },
    /// Position callback from the audio layer.
    PositionChanged {
        episode_id: String,
        position_secs: f64,
        /// Duration in seconds when known.
        duration_secs: Option<f64>,
    },
    /// The episode played to its natural end.
    Completed { episode_id: String },
    /// A recoverable playback failure (network error on play, decode error).
    Error {
        /// The episode involved, if one was active.
        episode_id: Option<String>,
        /// Human-readable error message.
        message: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::Completed { .. } => "Episode completed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to library and bookmark changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// New podcast subscribed.
    PodcastAdded {
        podcast_id: String,
        title: String,
        episode_count: usize,
    },
    /// Podcast removed along with its episodes.
    PodcastRemoved { podcast_id: String },
    /// An episode's progress/played/last-played state changed in memory.
    EpisodeStateChanged {
        episode_id: String,
        /// Progress fraction in `[0, 1]`.
        progress: f64,
        played: bool,
    },
    /// Bookmark captured.
    BookmarkAdded {
        bookmark_id: String,
        episode_id: String,
        timestamp_secs: f64,
    },
    /// Bookmark note edited.
    BookmarkUpdated { bookmark_id: String },
    /// Bookmark deleted.
    BookmarkRemoved { bookmark_id: String },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::PodcastAdded { .. } => "Podcast added to library",
            LibraryEvent::PodcastRemoved { .. } => "Podcast removed from library",
            LibraryEvent::EpisodeStateChanged { .. } => "Episode state changed",
            LibraryEvent::BookmarkAdded { .. } => "Bookmark added",
            LibraryEvent::BookmarkUpdated { .. } => "Bookmark updated",
            LibraryEvent::BookmarkRemoved { .. } => "Bookmark removed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
///
/// Cloning an `EventBus` is cheap and yields another handle to the same
/// channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when there are none. Emitters that don't care whether anyone is
    /// listening call `.ok()` on the result.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber receiving all future events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Pause Signal Bus
// ============================================================================

/// Broadcast primitive for forcing the playback session out of `Playing`.
///
/// Any number of actors (session teardown, sign-out, host lifecycle hooks)
/// may [`raise`](PauseSignalBus::raise) the signal; the playback session
/// subscribes once at construction and reacts by pausing and flushing a
/// checkpoint. The signal carries no payload: raising it twice
/// before the subscriber runs is indistinguishable from raising it once.
#[derive(Clone)]
pub struct PauseSignalBus {
    sender: broadcast::Sender<()>,
}

impl PauseSignalBus {
    /// Creates a new pause signal bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Raises the signal. Returns the number of subscribers notified; zero
    /// when nothing is listening (e.g., no session constructed yet), which is
    /// not an error.
    pub fn raise(&self) -> usize {
        self.sender.send(()).unwrap_or(0)
    }

    /// Subscribe to future signals.
    pub fn subscribe(&self) -> PauseSignals {
        PauseSignals {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for PauseSignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_PAUSE_SIGNAL_BUFFER_SIZE)
    }
}

impl fmt::Debug for PauseSignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseSignalBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

/// Receiving side of the [`PauseSignalBus`].
pub struct PauseSignals {
    receiver: broadcast::Receiver<()>,
}

impl PauseSignals {
    /// Waits for the next signal.
    ///
    /// Lagging coalesces into a single received signal. Returns an error only
    /// when the bus itself has been dropped.
    pub async fn recv(&mut self) -> Result<(), RecvError> {
        match self.receiver.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => Ok(()),
            Err(RecvError::Closed) => Err(RecvError::Closed),
        }
    }
}

impl fmt::Debug for PauseSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseSignals").finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let bus = EventBus::new(100);
/// let mut playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter; only matching events are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when the subscriber fell behind by `n` events,
    /// `RecvError::Closed` when all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
