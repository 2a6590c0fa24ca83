//! # Core Library Module
//!
//! Subscription and persistence layer of the podcast player core: podcasts,
//! episodes with per-user playback state, and bookmarks, all stored in
//! SQLite.
//!
//! ## Overview
//!
//! [`LibraryService`](service::LibraryService) holds the in-memory snapshot
//! of the user's subscriptions and is the only writer to it. Reads during
//! playback never touch the database; mutations go through the repositories
//! and are mirrored into the snapshot before an event is emitted.
//!
//! ## Layers
//!
//! - [`models`] - domain types ([`Podcast`], [`Episode`], [`Bookmark`]) and
//!   the checkpoint payload [`EpisodeStateUpdate`]
//! - [`repositories`] - async traits over SQLite for podcasts, episode
//!   playback state, and bookmarks
//! - [`db`] - connection pool setup and embedded migrations
//! - [`service`] - the in-memory library facade

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod service;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    Bookmark, BookmarkId, Episode, EpisodeId, EpisodeStateUpdate, Podcast, PodcastId, UserId,
};
pub use repositories::{
    BookmarkRepository, EpisodeStateRepository, PodcastRepository, SqliteBookmarkRepository,
    SqliteEpisodeStateRepository, SqlitePodcastRepository,
};
pub use service::LibraryService;
