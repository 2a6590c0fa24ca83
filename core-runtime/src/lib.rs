//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the podcast player core:
//! - Logging and tracing bootstrap
//! - Typed event bus for cross-module notifications
//! - The force-pause signal bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other modules depend on. It
//! establishes the logging conventions and the broadcast primitives used
//! throughout the system; it has no knowledge of podcasts, episodes, or
//! playback itself beyond the event payloads it defines.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{
    CoreEvent, EventBus, EventStream, LibraryEvent, PauseSignalBus, PauseSignals, PlaybackEvent,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};
