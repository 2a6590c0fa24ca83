//! Workspace aggregation crate.
//!
//! Re-exports the individual workspace crates so host applications can depend
//! on `podcast-core` alone instead of wiring each member crate individually.

pub use bridge_traits;
pub use core_library;
pub use core_playback;
pub use core_runtime;
