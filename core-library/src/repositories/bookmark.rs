//! Bookmark repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Bookmark, BookmarkId, EpisodeId, UserId};
use crate::repositories::parse_uuid;
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};

/// Bookmark repository interface for data access operations
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Load every bookmark belonging to the user, newest-first.
    async fn load_all(&self, user: &UserId) -> Result<Vec<Bookmark>>;

    /// Insert a bookmark.
    ///
    /// # Errors
    /// Returns an error if validation fails or the referenced episode does
    /// not exist.
    async fn insert(&self, bookmark: &Bookmark) -> Result<()>;

    /// Replace the note on an existing bookmark.
    ///
    /// # Returns
    /// - `Ok(true)` if the bookmark was updated
    /// - `Ok(false)` if it was not found for this user
    async fn update_note(&self, user: &UserId, id: BookmarkId, note: Option<&str>) -> Result<bool>;

    /// Delete a bookmark.
    ///
    /// # Returns
    /// - `Ok(true)` if the bookmark was deleted
    /// - `Ok(false)` if it was not found for this user
    async fn delete(&self, user: &UserId, id: BookmarkId) -> Result<bool>;

    /// Delete every bookmark belonging to the user.
    async fn delete_all(&self, user: &UserId) -> Result<()>;
}

#[derive(FromRow)]
struct BookmarkRow {
    id: String,
    user_id: String,
    episode_id: String,
    timestamp_secs: f64,
    note: Option<String>,
    created_at: i64,
}

impl TryFrom<BookmarkRow> for Bookmark {
    type Error = LibraryError;

    fn try_from(row: BookmarkRow) -> Result<Bookmark> {
        Ok(Bookmark {
            id: BookmarkId(parse_uuid("bookmarks.id", &row.id)?),
            user_id: UserId(row.user_id),
            episode_id: EpisodeId(parse_uuid("bookmarks.episode_id", &row.episode_id)?),
            timestamp_secs: row.timestamp_secs,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

/// SQLite implementation of BookmarkRepository
pub struct SqliteBookmarkRepository {
    pool: SqlitePool,
}

impl SqliteBookmarkRepository {
    /// Create a new SQLite bookmark repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookmarkRepository for SqliteBookmarkRepository {
    async fn load_all(&self, user: &UserId) -> Result<Vec<Bookmark>> {
        let rows = query_as::<_, BookmarkRow>(
            "SELECT * FROM bookmarks WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Bookmark::try_from).collect()
    }

    async fn insert(&self, bookmark: &Bookmark) -> Result<()> {
        bookmark
            .validate()
            .map_err(|msg| LibraryError::InvalidInput {
                field: "bookmark".to_string(),
                message: msg,
            })?;

        query(
            r#"
            INSERT INTO bookmarks (id, user_id, episode_id, timestamp_secs, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bookmark.id.to_string())
        .bind(bookmark.user_id.as_str())
        .bind(bookmark.episode_id.to_string())
        .bind(bookmark.timestamp_secs)
        .bind(&bookmark.note)
        .bind(bookmark.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_note(&self, user: &UserId, id: BookmarkId, note: Option<&str>) -> Result<bool> {
        let result = query("UPDATE bookmarks SET note = ? WHERE id = ? AND user_id = ?")
            .bind(note)
            .bind(id.to_string())
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user: &UserId, id: BookmarkId) -> Result<bool> {
        let result = query("DELETE FROM bookmarks WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user: &UserId) -> Result<()> {
        query("DELETE FROM bookmarks WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
