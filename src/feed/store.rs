/// Post, like, and comment storage operations
///
/// Every multi-row mutation (like + counter, comment + counter) runs inside
/// a single transaction. The UNIQUE(post_id, author_id) constraint on likes
/// means a double-tap can never double-increment a counter.
use crate::{
    error::{ApiError, ApiResult},
    feed::{format_relative_time, CommentView, EngagementCounts, FeedItem},
    metrics,
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// The backing store caps "value is one of N" filters at 10 values, so the
/// following feed issues one query per chunk of at most 10 author ids.
pub const FOLLOW_QUERY_CHUNK_SIZE: usize = 10;

/// Outcome of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Liked,
    Unliked,
}

impl LikeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeAction::Liked => "liked",
            LikeAction::Unliked => "unliked",
        }
    }
}

const FEED_ITEM_SELECT: &str = "SELECT p.id, p.author_id, p.content, p.media_url,
            p.like_count, p.comment_count, p.repost_count, p.created_at, p.updated_at,
            COALESCE(u.display_name, 'User') AS author_name,
            COALESCE(u.username, 'user') AS author_username,
            u.avatar_url AS author_avatar,
            EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.author_id = ?1)
                AS user_liked
     FROM posts p
     LEFT JOIN users u ON u.id = p.author_id";

/// Post store service
pub struct PostStore {
    db: SqlitePool,
}

impl PostStore {
    /// Create a new post store
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a post
    ///
    /// Content is validated before any write.
    pub async fn create_post(
        &self,
        author_id: &str,
        content: &str,
        media_url: Option<&str>,
    ) -> ApiResult<FeedItem> {
        Self::validate_content(content, "Post content")?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO posts (id, author_id, content, media_url,
                                like_count, comment_count, repost_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?6)",
        )
        .bind(&id)
        .bind(author_id)
        .bind(content)
        .bind(media_url)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        self.get_post(&id, author_id).await
    }

    /// Get a single post as a display-ready feed item
    pub async fn get_post(&self, post_id: &str, viewer_id: &str) -> ApiResult<FeedItem> {
        let sql = format!("{} WHERE p.id = ?2", FEED_ITEM_SELECT);
        let row = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(post_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

        Ok(Self::feed_item_from_row(&row, Utc::now()))
    }

    /// Home timeline: every post except the viewer's own, newest first
    pub async fn timeline(&self, viewer_id: &str) -> ApiResult<Vec<FeedItem>> {
        let sql = format!(
            "{} WHERE p.author_id != ?1 ORDER BY p.created_at DESC",
            FEED_ITEM_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(viewer_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        let now = Utc::now();
        Ok(rows
            .iter()
            .map(|row| Self::feed_item_from_row(row, now))
            .collect())
    }

    /// Posts by a single author, newest first
    pub async fn posts_by_author(
        &self,
        author_id: &str,
        viewer_id: &str,
    ) -> ApiResult<Vec<FeedItem>> {
        let sql = format!(
            "{} WHERE p.author_id = ?2 ORDER BY p.created_at DESC",
            FEED_ITEM_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(author_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        let now = Utc::now();
        Ok(rows
            .iter()
            .map(|row| Self::feed_item_from_row(row, now))
            .collect())
    }

    /// Following timeline: posts from the given authors, newest first
    ///
    /// An empty author list short-circuits without issuing any post query.
    /// Otherwise one query is issued per chunk of at most
    /// `FOLLOW_QUERY_CHUNK_SIZE` ids and the merged result is re-sorted
    /// globally, since per-chunk order is not a global order.
    pub async fn following_timeline(
        &self,
        viewer_id: &str,
        following: &[String],
    ) -> ApiResult<Vec<FeedItem>> {
        if following.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut items: Vec<FeedItem> = Vec::new();

        for chunk in following.chunks(FOLLOW_QUERY_CHUNK_SIZE) {
            let placeholders = (0..chunk.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "{} WHERE p.author_id IN ({}) ORDER BY p.created_at DESC",
                FEED_ITEM_SELECT, placeholders
            );

            let mut query = sqlx::query(&sql).bind(viewer_id);
            for author_id in chunk {
                query = query.bind(author_id);
            }

            let rows = query
                .fetch_all(&self.db)
                .await
                .map_err(|e| ApiError::Database(e))?;

            metrics::FEED_CHUNK_QUERIES_TOTAL.inc();

            items.extend(rows.iter().map(|row| Self::feed_item_from_row(row, now)));
        }

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(items)
    }

    /// Toggle a like: like when absent, unlike when present
    ///
    /// Check, like row, and counter update commit together.
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> ApiResult<LikeAction> {
        let mut tx = self.db.begin().await.map_err(|e| ApiError::Database(e))?;

        let post_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = ?1")
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        if post_exists == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM likes WHERE post_id = ?1 AND author_id = ?2")
                .bind(post_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| ApiError::Database(e))?;

        let action = if let Some(like_id) = existing {
            sqlx::query("DELETE FROM likes WHERE id = ?1")
                .bind(&like_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| ApiError::Database(e))?;

            sqlx::query("UPDATE posts SET like_count = like_count - 1 WHERE id = ?1")
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| ApiError::Database(e))?;

            LikeAction::Unliked
        } else {
            sqlx::query(
                "INSERT INTO likes (id, post_id, author_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(post_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    ApiError::Conflict("Already liked".to_string())
                }
                _ => ApiError::Database(e),
            })?;

            sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = ?1")
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| ApiError::Database(e))?;

            LikeAction::Liked
        };

        tx.commit().await.map_err(|e| ApiError::Database(e))?;

        metrics::SOCIAL_OPERATIONS_TOTAL
            .with_label_values(&[action.as_str()])
            .inc();

        Ok(action)
    }

    /// Remove an existing like
    pub async fn unlike(&self, post_id: &str, user_id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await.map_err(|e| ApiError::Database(e))?;

        let deleted = sqlx::query("DELETE FROM likes WHERE post_id = ?1 AND author_id = ?2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?
            .rows_affected();

        if deleted == 0 {
            return Err(ApiError::NotFound("Like not found".to_string()));
        }

        sqlx::query("UPDATE posts SET like_count = like_count - 1 WHERE id = ?1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        tx.commit().await.map_err(|e| ApiError::Database(e))?;

        metrics::SOCIAL_OPERATIONS_TOTAL
            .with_label_values(&["unliked"])
            .inc();

        Ok(())
    }

    /// Create a comment and bump the parent post's counter together
    pub async fn create_comment(
        &self,
        post_id: &str,
        author_id: &str,
        content: &str,
    ) -> ApiResult<CommentView> {
        Self::validate_content(content, "Comment")?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.db.begin().await.map_err(|e| ApiError::Database(e))?;

        let post_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = ?1")
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        if post_exists == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Database(e))?;

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        tx.commit().await.map_err(|e| ApiError::Database(e))?;

        metrics::SOCIAL_OPERATIONS_TOTAL
            .with_label_values(&["comment"])
            .inc();

        let comment = self.get_comment(&id).await?;

        Ok(comment)
    }

    /// Comments on a post, oldest first, hydrated with author display fields
    pub async fn comments_for_post(&self, post_id: &str) -> ApiResult<Vec<CommentView>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, c.content, c.created_at,
                    COALESCE(u.display_name, 'User') AS author_name,
                    COALESCE(u.username, 'user') AS author_username,
                    u.avatar_url AS author_avatar
             FROM comments c
             LEFT JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?1
             ORDER BY c.created_at",
        )
        .bind(post_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        let now = Utc::now();
        Ok(rows
            .iter()
            .map(|row| Self::comment_from_row(row, now))
            .collect())
    }

    /// Whether the user has liked the post
    pub async fn user_liked(&self, post_id: &str, user_id: &str) -> ApiResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND author_id = ?2")
                .bind(post_id)
                .bind(user_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| ApiError::Database(e))?;

        Ok(count > 0)
    }

    /// Single comment lookup with author hydration
    async fn get_comment(&self, comment_id: &str) -> ApiResult<CommentView> {
        let row = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, c.content, c.created_at,
                    COALESCE(u.display_name, 'User') AS author_name,
                    COALESCE(u.username, 'user') AS author_username,
                    u.avatar_url AS author_avatar
             FROM comments c
             LEFT JOIN users u ON u.id = c.author_id
             WHERE c.id = ?1",
        )
        .bind(comment_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

        Ok(Self::comment_from_row(&row, Utc::now()))
    }

    /// Reject empty or over-long content before any write
    fn validate_content(content: &str, what: &str) -> ApiResult<()> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation(format!("{} cannot be empty", what)));
        }

        if content.chars().count() > 280 {
            return Err(ApiError::Validation(format!(
                "{} cannot exceed 280 characters",
                what
            )));
        }

        Ok(())
    }

    /// Map a joined row to a display-ready feed item
    fn feed_item_from_row(row: &SqliteRow, now: DateTime<Utc>) -> FeedItem {
        let created_at: DateTime<Utc> = row.get("created_at");
        let user_liked: i64 = row.get("user_liked");

        FeedItem {
            id: row.get("id"),
            author_id: row.get("author_id"),
            content: row.get("content"),
            media_url: row.get("media_url"),
            created_at,
            updated_at: row.get("updated_at"),
            state: EngagementCounts {
                likes: row.get("like_count"),
                comments: row.get("comment_count"),
                retweets: row.get("repost_count"),
            },
            author_name: row.get("author_name"),
            author_username: row.get("author_username"),
            author_avatar: row.get("author_avatar"),
            time: format_relative_time(created_at, now),
            user_liked: user_liked != 0,
        }
    }

    /// Map a joined row to a display-ready comment
    fn comment_from_row(row: &SqliteRow, now: DateTime<Utc>) -> CommentView {
        let created_at: DateTime<Utc> = row.get("created_at");

        CommentView {
            id: row.get("id"),
            post_id: row.get("post_id"),
            author_id: row.get("author_id"),
            content: row.get("content"),
            created_at,
            author_name: row.get("author_name"),
            author_username: row.get("author_username"),
            author_avatar: row.get("author_avatar"),
            time: format_relative_time(created_at, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_splits_25_ids_into_10_10_5() {
        let ids: Vec<String> = (0..25).map(|i| format!("user-{}", i)).collect();
        let chunks: Vec<&[String]> = ids.chunks(FOLLOW_QUERY_CHUNK_SIZE).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[1].len(), 10);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn content_validation_rejects_281_chars() {
        let content = "x".repeat(281);
        let err = PostStore::validate_content(&content, "Post content").unwrap_err();
        assert!(err
            .to_string()
            .contains("cannot exceed 280 characters"));
    }

    #[test]
    fn content_validation_accepts_280_chars() {
        let content = "x".repeat(280);
        assert!(PostStore::validate_content(&content, "Post content").is_ok());
    }

    #[test]
    fn content_validation_rejects_whitespace_only() {
        assert!(PostStore::validate_content("   ", "Comment").is_err());
    }
}
