//! # Core Playback Module
//!
//! The playback-session state machine and progress-synchronization engine.
//!
//! ## Overview
//!
//! [`PlayerSession`](session::PlayerSession) coordinates a single active
//! audio stream against the durable per-user state kept in `core-library`.
//! Transport controls, high-frequency position callbacks from the audio
//! bridge, and the external force-pause signal all funnel through one mutex;
//! durable progress writes are coalesced by the
//! [`CheckpointWriter`](checkpoint::CheckpointWriter) into at most one write
//! per debounce window, with forced flushes on transport boundaries.
//!
//! ## Components
//!
//! - [`transport`] - the `Transport` state machine with its single validated
//!   transition function
//! - [`session`] - the session controller
//! - [`checkpoint`] - the debounced checkpoint writer
//! - [`bookmarks`] - bookmark capture, drafts, and bookmark-mode playback
//! - [`history`] - the derived recency-sorted play history
//! - [`config`] - skip deltas and the checkpoint interval

pub mod bookmarks;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod history;
pub mod session;
pub mod transport;

pub use bookmarks::BookmarkManager;
pub use checkpoint::CheckpointWriter;
pub use config::PlaybackConfig;
pub use error::{PlaybackError, Result};
pub use history::HistoryView;
pub use session::PlayerSession;
pub use transport::{PlaybackMode, Transport, TransportAction};
