use crate::transport::{Transport, TransportAction};
use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Episode not found: {id}")]
    EpisodeNotFound { id: String },

    #[error("Bookmark not found: {id}")]
    BookmarkNotFound { id: String },

    #[error("Invalid transport transition: {action:?} in {from:?}")]
    InvalidTransition {
        from: Transport,
        action: TransportAction,
    },
}

impl PlaybackError {
    /// Whether the session stays usable after this error.
    ///
    /// Bridge failures are recoverable: the source handle stays valid and
    /// the transport falls back to a resting state. Transition errors signal
    /// a caller bug and are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PlaybackError::InvalidTransition { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
