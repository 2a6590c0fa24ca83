//! Podcast repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Episode, EpisodeId, Podcast, PodcastId, UserId};
use crate::repositories::parse_uuid;
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};

/// Podcast repository interface for data access operations
#[async_trait]
pub trait PodcastRepository: Send + Sync {
    /// Load the user's full library: every podcast with its episodes, podcasts
    /// ordered newest-subscription-first, episodes ordered by publication date
    /// descending.
    async fn load_all(&self, user: &UserId) -> Result<Vec<Podcast>>;

    /// Look up a podcast by feed URL for duplicate detection.
    ///
    /// # Returns
    /// - `Ok(Some(id))` when the user already subscribed to this feed
    /// - `Ok(None)` otherwise
    async fn find_by_feed_url(&self, user: &UserId, feed_url: &str) -> Result<Option<PodcastId>>;

    /// Insert a podcast and all its episodes atomically.
    ///
    /// # Errors
    /// Returns an error if validation fails or the feed URL is already
    /// present for this user.
    async fn insert(&self, podcast: &Podcast) -> Result<()>;

    /// Delete a podcast; episodes and their bookmarks cascade.
    ///
    /// # Returns
    /// - `Ok(true)` if the podcast was deleted
    /// - `Ok(false)` if it was not found for this user
    async fn delete(&self, user: &UserId, id: PodcastId) -> Result<bool>;

    /// Delete every podcast (and, by cascade, all episodes and bookmarks)
    /// belonging to the user.
    async fn delete_all(&self, user: &UserId) -> Result<()>;
}

#[derive(FromRow)]
struct PodcastRow {
    id: String,
    user_id: String,
    title: String,
    description: String,
    image_url: Option<String>,
    author: Option<String>,
    feed_url: String,
    created_at: i64,
}

impl PodcastRow {
    fn into_podcast(self, episodes: Vec<Episode>) -> Result<Podcast> {
        Ok(Podcast {
            id: PodcastId(parse_uuid("podcasts.id", &self.id)?),
            user_id: UserId(self.user_id),
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            author: self.author,
            feed_url: self.feed_url,
            created_at: self.created_at,
            episodes,
        })
    }
}

#[derive(FromRow)]
struct EpisodeRow {
    id: String,
    podcast_id: String,
    title: String,
    description: String,
    audio_url: String,
    image_url: Option<String>,
    pub_date: Option<String>,
    duration_secs: Option<f64>,
    progress: f64,
    played: bool,
    last_played: Option<i64>,
}

impl TryFrom<EpisodeRow> for Episode {
    type Error = LibraryError;

    fn try_from(row: EpisodeRow) -> Result<Episode> {
        Ok(Episode {
            id: EpisodeId(parse_uuid("episodes.id", &row.id)?),
            podcast_id: PodcastId(parse_uuid("episodes.podcast_id", &row.podcast_id)?),
            title: row.title,
            description: row.description,
            audio_url: row.audio_url,
            image_url: row.image_url,
            pub_date: row.pub_date,
            duration_secs: row.duration_secs,
            progress: row.progress,
            played: row.played,
            last_played: row.last_played,
        })
    }
}

/// SQLite implementation of PodcastRepository
pub struct SqlitePodcastRepository {
    pool: SqlitePool,
}

impl SqlitePodcastRepository {
    /// Create a new SQLite podcast repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PodcastRepository for SqlitePodcastRepository {
    async fn load_all(&self, user: &UserId) -> Result<Vec<Podcast>> {
        let podcast_rows = query_as::<_, PodcastRow>(
            "SELECT * FROM podcasts WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut podcasts = Vec::with_capacity(podcast_rows.len());
        for row in podcast_rows {
            let episode_rows = query_as::<_, EpisodeRow>(
                "SELECT * FROM episodes WHERE podcast_id = ? ORDER BY pub_date DESC",
            )
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

            let episodes = episode_rows
                .into_iter()
                .map(Episode::try_from)
                .collect::<Result<Vec<_>>>()?;

            podcasts.push(row.into_podcast(episodes)?);
        }

        Ok(podcasts)
    }

    async fn find_by_feed_url(&self, user: &UserId, feed_url: &str) -> Result<Option<PodcastId>> {
        let id: Option<(String,)> =
            query_as("SELECT id FROM podcasts WHERE user_id = ? AND feed_url = ?")
                .bind(user.as_str())
                .bind(feed_url)
                .fetch_optional(&self.pool)
                .await?;

        match id {
            Some((id,)) => Ok(Some(PodcastId(parse_uuid("podcasts.id", &id)?))),
            None => Ok(None),
        }
    }

    async fn insert(&self, podcast: &Podcast) -> Result<()> {
        podcast.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "podcast".to_string(),
            message: msg,
        })?;

        let mut tx = self.pool.begin().await?;

        query(
            r#"
            INSERT INTO podcasts (
                id, user_id, title, description, image_url, author, feed_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(podcast.id.to_string())
        .bind(podcast.user_id.as_str())
        .bind(&podcast.title)
        .bind(&podcast.description)
        .bind(&podcast.image_url)
        .bind(&podcast.author)
        .bind(&podcast.feed_url)
        .bind(podcast.created_at)
        .execute(&mut *tx)
        .await?;

        for episode in &podcast.episodes {
            query(
                r#"
                INSERT INTO episodes (
                    id, podcast_id, title, description, audio_url, image_url,
                    pub_date, duration_secs, progress, played, last_played
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(episode.id.to_string())
            .bind(episode.podcast_id.to_string())
            .bind(&episode.title)
            .bind(&episode.description)
            .bind(&episode.audio_url)
            .bind(&episode.image_url)
            .bind(&episode.pub_date)
            .bind(episode.duration_secs)
            .bind(episode.progress)
            .bind(episode.played)
            .bind(episode.last_played)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, user: &UserId, id: PodcastId) -> Result<bool> {
        let result = query("DELETE FROM podcasts WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user: &UserId) -> Result<()> {
        query("DELETE FROM podcasts WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
