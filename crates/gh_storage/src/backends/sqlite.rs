use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gh_core::storage::MAX_COMMENTS_PAGE;
use gh_core::{
    Category, Comment, Engagement, Enrichment, Error, LikeStatus, NewComment, Result, SaveReport,
    StoredStory, StoryGroup, StoryPage, StoryQuery, StoryStorage,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

use super::{comment_id, finish_page, save_in_batches, timestamp};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stories (
        id TEXT PRIMARY KEY,
        pub_date TEXT NOT NULL,
        category TEXT NOT NULL,
        story TEXT NOT NULL,
        enrichment TEXT,
        processed INTEGER NOT NULL DEFAULT 0,
        listed INTEGER NOT NULL DEFAULT 0,
        fetched_at TEXT NOT NULL,
        processed_at TEXT,
        likes INTEGER NOT NULL DEFAULT 0,
        shares INTEGER NOT NULL DEFAULT 0,
        views INTEGER NOT NULL DEFAULT 0,
        comment_count INTEGER NOT NULL DEFAULT 0,
        liked_by TEXT NOT NULL DEFAULT '[]'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS stories_listing ON stories (listed, pub_date DESC, id)",
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        story_id TEXT NOT NULL REFERENCES stories (id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        username TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL,
        seq INTEGER NOT NULL,
        reported INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS comments_by_story ON comments (story_id, created_at DESC)",
];

const SAVE_BACKOFF: Duration = Duration::from_secs(1);

fn db_error(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("bad timestamp {}: {}", raw, e)))
}

fn story_from_row(row: &SqliteRow) -> Result<StoredStory> {
    let mut story: StoryGroup = serde_json::from_str(row.try_get("story").map_err(db_error)?)?;
    let category: String = row.try_get("category").map_err(db_error)?;
    story.category = category.parse::<Category>()?;

    let enrichment = match row.try_get::<Option<String>, _>("enrichment").map_err(db_error)? {
        Some(raw) => Some(serde_json::from_str::<Enrichment>(&raw)?),
        None => None,
    };
    let processed_at = match row.try_get::<Option<String>, _>("processed_at").map_err(db_error)? {
        Some(raw) => Some(parse_timestamp(&raw)?),
        None => None,
    };

    Ok(StoredStory {
        id: row.try_get("id").map_err(db_error)?,
        story,
        enrichment,
        processed: row.try_get("processed").map_err(db_error)?,
        fetched_at: parse_timestamp(row.try_get("fetched_at").map_err(db_error)?)?,
        processed_at,
        engagement: Engagement {
            likes: row.try_get::<i64, _>("likes").map_err(db_error)? as u64,
            shares: row.try_get::<i64, _>("shares").map_err(db_error)? as u64,
            views: row.try_get::<i64, _>("views").map_err(db_error)? as u64,
            comment_count: row.try_get::<i64, _>("comment_count").map_err(db_error)? as u64,
            liked_by: serde_json::from_str(row.try_get("liked_by").map_err(db_error)?)?,
        },
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id").map_err(db_error)?,
        story_id: row.try_get("story_id").map_err(db_error)?,
        user_id: row.try_get("user_id").map_err(db_error)?,
        username: row.try_get("username").map_err(db_error)?,
        text: row.try_get("text").map_err(db_error)?,
        created_at: parse_timestamp(row.try_get("created_at").map_err(db_error)?)?,
        reported: row.try_get("reported").map_err(db_error)?,
    })
}

/// Story storage in a single SQLite file.
///
/// The group itself is kept as JSON; the columns next to it hold what the
/// listing queries filter and sort on.
pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
    next_comment: AtomicU64,
}

impl SqliteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("migration {} failed: {}", i, e)))?;
        }
        info!("🗄️ Opened story database at {}", db_path.display());

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
            next_comment: AtomicU64::new(0),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn commit_batch(&self, batch: Vec<StoredStory>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for stored in &batch {
            // Enriched rows keep the category the enricher chose.
            sqlx::query(
                r#"
                INSERT INTO stories (id, pub_date, category, story, fetched_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    story = excluded.story,
                    category = CASE WHEN stories.enrichment IS NULL
                        THEN excluded.category ELSE stories.category END
                "#,
            )
            .bind(&stored.id)
            .bind(timestamp(stored.story.pub_date))
            .bind(stored.story.category.as_str())
            .bind(serde_json::to_string(&stored.story)?)
            .bind(timestamp(stored.fetched_at))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)
    }

    async fn bump(&self, id: &str, column: &str) -> Result<()> {
        let result = sqlx::query(&format!("UPDATE stories SET {0} = {0} + 1 WHERE id = ?", column))
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("story {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl StoryStorage for SqliteStorage {
    async fn save_stories(&self, stories: &[StoryGroup]) -> Result<SaveReport> {
        let report = save_in_batches(stories, Utc::now(), SAVE_BACKOFF, |batch| self.commit_batch(batch)).await;
        info!("💾 Saved {} stories ({} failed)", report.saved, report.failed);
        Ok(report)
    }

    async fn get_story(&self, id: &str) -> Result<Option<StoredStory>> {
        let row = sqlx::query("SELECT * FROM stories WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(story_from_row).transpose()
    }

    async fn list_stories(&self, query: &StoryQuery) -> Result<StoryPage> {
        let after = match &query.cursor {
            Some(cursor) => sqlx::query("SELECT pub_date, id FROM stories WHERE id = ?")
                .bind(cursor)
                .fetch_optional(&*self.pool)
                .await
                .map_err(db_error)?
                .map(|row| -> Result<(String, String)> {
                    Ok((
                        row.try_get("pub_date").map_err(db_error)?,
                        row.try_get("id").map_err(db_error)?,
                    ))
                })
                .transpose()?,
            None => None,
        };

        let mut sql: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT * FROM stories WHERE processed = 1 AND listed = 1 AND category <> 'sports'",
        );
        if let Some(category) = query.category {
            sql.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some((pub_date, id)) = after {
            sql.push(" AND (pub_date < ")
                .push_bind(pub_date.clone())
                .push(" OR (pub_date = ")
                .push_bind(pub_date)
                .push(" AND id > ")
                .push_bind(id)
                .push("))");
        }
        sql.push(" ORDER BY pub_date DESC, id ASC LIMIT ")
            .push_bind((query.effective_limit() + 1) as i64);

        let rows = sql.build().fetch_all(&*self.pool).await.map_err(db_error)?;
        let stories = rows.iter().map(story_from_row).collect::<Result<Vec<_>>>()?;
        Ok(finish_page(stories, query))
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<StoredStory>> {
        let rows = sqlx::query("SELECT * FROM stories WHERE processed = 0 ORDER BY pub_date DESC, id ASC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(story_from_row).collect()
    }

    async fn update_enrichment(&self, id: &str, enrichment: &Enrichment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE stories
            SET enrichment = ?, category = ?, listed = ?, processed = 1, processed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(serde_json::to_string(enrichment)?)
        .bind(enrichment.category.as_str())
        .bind(enrichment.summary.is_some())
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("story {}", id)));
        }
        Ok(())
    }

    async fn increment_views(&self, id: &str) -> Result<()> {
        self.bump(id, "views").await
    }

    async fn increment_shares(&self, id: &str) -> Result<()> {
        self.bump(id, "shares").await
    }

    async fn toggle_like(&self, id: &str, user_id: &str) -> Result<LikeStatus> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let row = sqlx::query("SELECT likes, liked_by FROM stories WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| Error::NotFound(format!("story {}", id)))?;

        let mut likes = row.try_get::<i64, _>("likes").map_err(db_error)? as u64;
        let mut liked_by: Vec<String> = serde_json::from_str(row.try_get("liked_by").map_err(db_error)?)?;
        let liked = match liked_by.iter().position(|u| u == user_id) {
            Some(pos) => {
                liked_by.remove(pos);
                likes = likes.saturating_sub(1);
                false
            }
            None => {
                liked_by.push(user_id.to_string());
                likes += 1;
                true
            }
        };

        sqlx::query("UPDATE stories SET likes = ?, liked_by = ? WHERE id = ?")
            .bind(likes as i64)
            .bind(serde_json::to_string(&liked_by)?)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(LikeStatus { liked, likes })
    }

    async fn add_comment(&self, id: &str, comment: NewComment) -> Result<Comment> {
        comment.validate()?;
        let created_at = Utc::now();
        let seq = self.next_comment.fetch_add(1, Ordering::Relaxed);
        let comment = Comment {
            id: comment_id(id, &comment.user_id, created_at, seq),
            story_id: id.to_string(),
            user_id: comment.user_id,
            username: comment.username,
            text: comment.text,
            created_at,
            reported: false,
        };

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let result = sqlx::query("UPDATE stories SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("story {}", id)));
        }
        sqlx::query(
            r#"
            INSERT INTO comments (id, story_id, user_id, username, text, created_at, seq)
            VALUES (?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM comments))
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.story_id)
        .bind(&comment.user_id)
        .bind(&comment.username)
        .bind(&comment.text)
        .bind(timestamp(created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(comment)
    }

    async fn get_comments(&self, id: &str, limit: usize) -> Result<Vec<Comment>> {
        if self.get_story(id).await?.is_none() {
            return Err(Error::NotFound(format!("story {}", id)));
        }
        let rows = sqlx::query(
            r#"
            SELECT * FROM comments
            WHERE story_id = ? AND reported = 0
            ORDER BY created_at DESC, seq DESC
            LIMIT ?
            "#,
        )
        .bind(id)
        .bind(limit.clamp(1, MAX_COMMENTS_PAGE) as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn report_comment(&self, comment_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE comments SET reported = 1 WHERE id = ?")
            .bind(comment_id)
            .execute(&*self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("comment {}", comment_id)));
        }
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM stories WHERE pub_date < ?")
            .bind(timestamp(cutoff))
            .execute(&*self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() as usize)
    }
}
