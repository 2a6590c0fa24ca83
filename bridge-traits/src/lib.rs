//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host
//! application embedding the podcast player core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core and the host: every trait
//! here represents a capability the core consumes but does not implement
//! itself. The playback session drives a host audio engine through
//! [`AudioBackend`](audio::AudioBackend), the library adds podcasts through a
//! host feed parser ([`FeedIngest`](feed::FeedIngest)), and local preferences
//! live behind [`SettingsStore`](settings::SettingsStore).
//!
//! ## Traits
//!
//! - [`AudioBackend`](audio::AudioBackend) - open/play/pause/seek a single
//!   audio source and stream its lifecycle events back to the core
//! - [`FeedIngest`](feed::FeedIngest) - fetch and normalize a podcast feed
//! - [`SettingsStore`](settings::SettingsStore) - key-value preference storage
//! - [`Clock`](time::Clock) - time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Host
//! implementations should convert platform-specific errors to `BridgeError`
//! with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so trait objects can be
//! shared across async tasks behind `Arc`.

pub mod audio;
pub mod error;
pub mod feed;
pub mod settings;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{AudioBackend, SourceEvent, SourceHandle};
pub use feed::{FeedIngest, ParsedEpisode, ParsedFeed};
pub use settings::SettingsStore;
pub use time::{Clock, ManualClock, SystemClock};
