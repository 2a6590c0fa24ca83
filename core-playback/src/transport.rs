//! Transport state machine.
//!
//! All session state lives in one [`Transport`] enum with a single validated
//! transition function. Bookmark playback is part of the state rather than a
//! side flag, so "playing from a bookmark while also checkpointing" cannot be
//! represented.

use crate::error::{PlaybackError, Result};
use core_library::models::EpisodeId;
use serde::{Deserialize, Serialize};

/// How the active source was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Ordinary playback; position ticks feed the checkpoint writer.
    Normal,
    /// Playback from a bookmarked timestamp; durable progress writes are
    /// suppressed until an ordinary transport action clears the mode.
    Bookmark,
}

/// Session transport state.
///
/// At most one episode occupies an active state at a time; the session holds
/// exactly one `Transport` value behind its mutex, so single-playing is a
/// structural property rather than a runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    /// No episode selected.
    Idle,
    /// Source opened, waiting for the backend's readiness event.
    Loading {
        episode_id: EpisodeId,
        mode: PlaybackMode,
    },
    /// Source is audible.
    Playing {
        episode_id: EpisodeId,
        mode: PlaybackMode,
    },
    /// Source held at its current position.
    Paused {
        episode_id: EpisodeId,
        mode: PlaybackMode,
    },
    /// Source reached its natural end; transient, released to `Idle`.
    Ended { episode_id: EpisodeId },
}

/// Input to [`Transport::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    /// Begin loading a new source.
    Load {
        episode_id: EpisodeId,
        mode: PlaybackMode,
    },
    /// The backend reported the source ready.
    SourceReady,
    /// Resume a paused source. Clears bookmark mode.
    Play,
    /// Pause the active source. Clears bookmark mode.
    Pause,
    /// The source reached its natural end.
    End,
    /// Release the source and return to `Idle`.
    Stop,
    /// The source failed; fall back to a resting state.
    Fail,
}

impl Transport {
    /// The episode occupying the transport, if any.
    pub fn episode_id(&self) -> Option<EpisodeId> {
        match self {
            Transport::Idle => None,
            Transport::Loading { episode_id, .. }
            | Transport::Playing { episode_id, .. }
            | Transport::Paused { episode_id, .. }
            | Transport::Ended { episode_id } => Some(*episode_id),
        }
    }

    /// The playback mode of an active source, if any.
    pub fn mode(&self) -> Option<PlaybackMode> {
        match self {
            Transport::Loading { mode, .. }
            | Transport::Playing { mode, .. }
            | Transport::Paused { mode, .. } => Some(*mode),
            Transport::Idle | Transport::Ended { .. } => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Transport::Playing { .. })
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Transport::Loading { .. } | Transport::Playing { .. } | Transport::Paused { .. }
        )
    }

    /// Whether position ticks should reach the checkpoint writer.
    pub fn checkpoints_enabled(&self) -> bool {
        matches!(
            self,
            Transport::Playing {
                mode: PlaybackMode::Normal,
                ..
            }
        )
    }

    /// Apply a transport action, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] when the action is not
    /// valid in the current state.
    pub fn apply(self, action: TransportAction) -> Result<Transport> {
        let next = match (self, action) {
            // A new source can be loaded from any state.
            (_, TransportAction::Load { episode_id, mode }) => {
                Transport::Loading { episode_id, mode }
            }

            (Transport::Loading { episode_id, mode }, TransportAction::SourceReady) => {
                Transport::Playing { episode_id, mode }
            }

            // Resuming is an ordinary transport action and clears bookmark
            // mode; subsequent ticks checkpoint again.
            (Transport::Paused { episode_id, .. }, TransportAction::Play) => Transport::Playing {
                episode_id,
                mode: PlaybackMode::Normal,
            },

            (
                Transport::Playing { episode_id, .. } | Transport::Loading { episode_id, .. },
                TransportAction::Pause,
            ) => Transport::Paused {
                episode_id,
                mode: PlaybackMode::Normal,
            },
            // Pausing while paused is harmless.
            (Transport::Paused { episode_id, .. }, TransportAction::Pause) => Transport::Paused {
                episode_id,
                mode: PlaybackMode::Normal,
            },

            (Transport::Playing { episode_id, .. }, TransportAction::End) => {
                Transport::Ended { episode_id }
            }

            (_, TransportAction::Stop) => Transport::Idle,

            // Failures while loading have nothing to hold on to; failures
            // while audible keep the position for a retry.
            (Transport::Loading { .. }, TransportAction::Fail) => Transport::Idle,
            (Transport::Playing { episode_id, mode }, TransportAction::Fail) => {
                Transport::Paused { episode_id, mode }
            }
            (Transport::Paused { episode_id, mode }, TransportAction::Fail) => {
                Transport::Paused { episode_id, mode }
            }

            (from, action) => return Err(PlaybackError::InvalidTransition { from, action }),
        };

        Ok(next)
    }
}
