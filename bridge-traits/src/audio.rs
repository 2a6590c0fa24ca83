//! Audio backend bridge trait and source lifecycle events.
//!
//! The core never touches an audio device directly. It opens a source through
//! an [`AudioBackend`] implementation provided by the host (a media element on
//! web views, a native engine on desktop/mobile) and observes that source
//! through the event receiver returned by [`AudioBackend::open`].
//!
//! All positions are expressed in seconds as `f64`; the core works in
//! fractional progress values and bookmark timestamps, so seconds are the
//! natural unit at this seam.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque identifier for an open audio source.
///
/// Handles are single-use: once [`AudioBackend::close`] has been called for a
/// handle, every subsequent control call with it must fail with
/// [`BridgeError::UnknownHandle`](crate::BridgeError::UnknownHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(Uuid);

impl SourceHandle {
    /// Generate a fresh handle. Intended for backend implementations.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SourceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle events emitted by an open audio source.
///
/// Backends must emit exactly one `Ready` per open (even when metadata is
/// instantly available), so consumers have a single readiness path for both
/// the "already loaded" and "still loading" cases.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Source metadata is loaded and the source accepts seeks.
    Ready {
        /// Total duration in seconds, when the container reports one.
        duration: Option<f64>,
    },
    /// Periodic position callback while the source is playing.
    Position {
        /// Current position in seconds.
        position: f64,
    },
    /// The source reached its natural end.
    Ended,
    /// The source failed (network error, decode error). Recoverable from the
    /// session's point of view; the handle stays valid for a retry or close.
    Error { message: String },
}

/// Trait for host audio engines that play a single source at a time per handle.
///
/// The core guarantees it never keeps two handles in a playing state; backends
/// may rely on that but should not enforce it.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Open `url` and begin loading it. Returns the handle used by subsequent
    /// control calls together with the receiver for this source's events.
    ///
    /// The receiver is the only delivery path for [`SourceEvent`]s; dropping
    /// it (or aborting the task draining it) detaches the core from the
    /// source without closing it.
    async fn open(&self, url: &str) -> Result<(SourceHandle, mpsc::Receiver<SourceEvent>)>;

    /// Begin or resume playback.
    async fn play(&self, handle: SourceHandle) -> Result<()>;

    /// Pause playback without releasing the source.
    async fn pause(&self, handle: SourceHandle) -> Result<()>;

    /// Seek to an absolute position in seconds. Backends clamp to the known
    /// duration when one is available.
    async fn seek(&self, handle: SourceHandle, position: f64) -> Result<()>;

    /// Adjust volume, normalized to `0.0..=1.0`.
    async fn set_volume(&self, handle: SourceHandle, volume: f32) -> Result<()>;

    /// Adjust playback rate (1.0 = normal speed).
    async fn set_rate(&self, handle: SourceHandle, rate: f32) -> Result<()>;

    /// Query the current position in seconds.
    async fn position(&self, handle: SourceHandle) -> Result<f64>;

    /// Release the source and invalidate the handle. The event channel is
    /// closed; no further events are delivered.
    async fn close(&self, handle: SourceHandle) -> Result<()>;
}
