//! Playback configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default skip-forward delta in seconds.
pub const DEFAULT_SKIP_FORWARD_SECS: f64 = 30.0;

/// Default skip-backward delta in seconds.
pub const DEFAULT_SKIP_BACKWARD_SECS: f64 = 15.0;

/// Minimum spacing between durable progress writes for one episode.
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_millis(2000);

/// Tunables for the playback session and checkpoint writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Seconds the skip-forward control jumps.
    pub skip_forward_secs: f64,

    /// Seconds the skip-backward control jumps.
    pub skip_backward_secs: f64,

    /// Debounce window between durable progress writes.
    pub checkpoint_interval: Duration,

    /// Initial volume, normalized to `0.0..=1.0`.
    pub initial_volume: f32,
}

impl PlaybackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the checkpoint debounce window
    pub fn checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set the skip deltas, in seconds
    pub fn skip_deltas(mut self, forward: f64, backward: f64) -> Self {
        self.skip_forward_secs = forward;
        self.skip_backward_secs = backward;
        self
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            skip_forward_secs: DEFAULT_SKIP_FORWARD_SECS,
            skip_backward_secs: DEFAULT_SKIP_BACKWARD_SECS,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            initial_volume: 1.0,
        }
    }
}
