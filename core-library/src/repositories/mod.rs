//! Repository traits and SQLite implementations.
//!
//! Each repository pairs an async trait (the seam the rest of the core
//! depends on, mockable in tests) with a `Sqlite*Repository` implementation
//! over the shared connection pool.

pub mod bookmark;
pub mod episode;
pub mod podcast;

pub use bookmark::{BookmarkRepository, SqliteBookmarkRepository};
pub use episode::{EpisodeStateRepository, SqliteEpisodeStateRepository};
pub use podcast::{PodcastRepository, SqlitePodcastRepository};

use crate::error::{LibraryError, Result};
use uuid::Uuid;

/// Parse a stored UUID column, attributing failures to the named field.
pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| LibraryError::InvalidInput {
        field: field.to_string(),
        message: format!("'{}' is not a valid UUID: {}", value, e),
    })
}
