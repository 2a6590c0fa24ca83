//! Episode playback-state repository.
//!
//! The narrow durable-store surface the checkpoint writer talks to. Episode
//! rows are created by [`PodcastRepository::insert`](
//! crate::repositories::PodcastRepository::insert); this repository only
//! updates the per-user playback state columns.

use crate::error::{LibraryError, Result};
use crate::models::{EpisodeId, EpisodeStateUpdate};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Episode playback-state repository interface
#[async_trait]
pub trait EpisodeStateRepository: Send + Sync {
    /// Persist a checkpoint snapshot for an episode.
    ///
    /// # Errors
    /// Returns an error if the snapshot fails validation, the episode does
    /// not exist, or the write fails.
    async fn save_state(&self, episode_id: EpisodeId, state: &EpisodeStateUpdate) -> Result<()>;

    /// Mark an episode played without touching its progress (first-selection
    /// semantics).
    async fn mark_played(&self, episode_id: EpisodeId, last_played: i64) -> Result<()>;

    /// Read back the stored playback state.
    ///
    /// # Returns
    /// - `Ok(Some(state))` for an existing episode
    /// - `Ok(None)` when the episode is unknown
    async fn load_state(&self, episode_id: EpisodeId) -> Result<Option<EpisodeStateUpdate>>;
}

/// SQLite implementation of EpisodeStateRepository
pub struct SqliteEpisodeStateRepository {
    pool: SqlitePool,
}

impl SqliteEpisodeStateRepository {
    /// Create a new SQLite episode-state repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EpisodeStateRepository for SqliteEpisodeStateRepository {
    async fn save_state(&self, episode_id: EpisodeId, state: &EpisodeStateUpdate) -> Result<()> {
        state.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "episode_state".to_string(),
            message: msg,
        })?;

        let result = query(
            "UPDATE episodes SET progress = ?, played = ?, last_played = ? WHERE id = ?",
        )
        .bind(state.progress)
        .bind(state.played)
        .bind(state.last_played)
        .bind(episode_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "episode".to_string(),
                id: episode_id.to_string(),
            });
        }

        Ok(())
    }

    async fn mark_played(&self, episode_id: EpisodeId, last_played: i64) -> Result<()> {
        let result = query("UPDATE episodes SET played = 1, last_played = ? WHERE id = ?")
            .bind(last_played)
            .bind(episode_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "episode".to_string(),
                id: episode_id.to_string(),
            });
        }

        Ok(())
    }

    async fn load_state(&self, episode_id: EpisodeId) -> Result<Option<EpisodeStateUpdate>> {
        let row: Option<(f64, bool, Option<i64>)> =
            query_as("SELECT progress, played, last_played FROM episodes WHERE id = ?")
                .bind(episode_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(progress, played, last_played)| EpisodeStateUpdate {
            progress,
            played,
            last_played: last_played.unwrap_or(0),
        }))
    }
}
