/// Profile and follow graph storage operations
use crate::{
    error::{ApiError, ApiResult},
    metrics,
    profile::{FollowListEntry, ProfileStats, ProfileView, UserSummary},
};
use chrono::Utc;
use futures::future::join_all;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

/// Profile store service
pub struct ProfileStore {
    db: SqlitePool,
}

impl ProfileStore {
    /// Create a new profile store
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Get a user's profile with follower/following id lists and counters
    pub async fn get_profile(&self, user_id: &str) -> ApiResult<ProfileView> {
        let row = sqlx::query(
            "SELECT id, username, email, display_name, avatar_url,
                    followers_count, following_count, created_at
             FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?
        .ok_or_else(|| ApiError::NotFound("No such user profile".to_string()))?;

        let followers = self.follower_ids(user_id).await?;
        let following = self.following_ids(user_id).await?;

        Ok(ProfileView {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            name: row.get("display_name"),
            avatar: row.get("avatar_url"),
            created_at: row.get("created_at"),
            stats: ProfileStats {
                followers_count: row.get("followers_count"),
                following_count: row.get("following_count"),
            },
            followers,
            following,
        })
    }

    /// Update display name and/or avatar
    pub async fn update_profile(
        &self,
        user_id: &str,
        name: Option<&str>,
        avatar: Option<&str>,
    ) -> ApiResult<ProfileView> {
        if name.is_none() && avatar.is_none() {
            return self.get_profile(user_id).await;
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE users
             SET display_name = COALESCE(?1, display_name),
                 avatar_url = COALESCE(?2, avatar_url),
                 updated_at = ?3
             WHERE id = ?4",
        )
        .bind(name)
        .bind(avatar)
        .bind(now)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("No such user profile".to_string()));
        }

        self.get_profile(user_id).await
    }

    /// Prefix search over username and display name, excluding the caller
    ///
    /// An empty or whitespace-only query returns an empty list without
    /// touching storage.
    pub async fn search_users(&self, query: &str, viewer_id: &str) -> ApiResult<Vec<UserSummary>> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, username, display_name, avatar_url FROM users
             WHERE (username LIKE ?1 || '%' OR LOWER(display_name) LIKE ?1 || '%')
               AND id != ?2
             ORDER BY username
             LIMIT 50",
        )
        .bind(&term)
        .bind(viewer_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        let users = rows
            .into_iter()
            .map(|row| UserSummary {
                id: row.get("id"),
                username: row.get("username"),
                name: row.get("display_name"),
                avatar: row.get("avatar_url"),
            })
            .collect();

        Ok(users)
    }

    /// Follow a user
    ///
    /// Edge insert plus both counter updates commit together; the edge
    /// primary key rejects a duplicate follow.
    pub async fn follow(&self, actor_id: &str, target_id: &str) -> ApiResult<()> {
        if actor_id == target_id {
            return Err(ApiError::Validation(
                "You can't follow yourself".to_string(),
            ));
        }

        let mut tx = self.db.begin().await.map_err(|e| ApiError::Database(e))?;

        let target_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?1")
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        if target_exists == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        sqlx::query("INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(actor_id)
            .bind(target_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    ApiError::Conflict("Already following".to_string())
                }
                _ => ApiError::Database(e),
            })?;

        sqlx::query("UPDATE users SET following_count = following_count + 1 WHERE id = ?1")
            .bind(actor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        sqlx::query("UPDATE users SET followers_count = followers_count + 1 WHERE id = ?1")
            .bind(target_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        tx.commit().await.map_err(|e| ApiError::Database(e))?;

        metrics::SOCIAL_OPERATIONS_TOTAL
            .with_label_values(&["follow"])
            .inc();

        Ok(())
    }

    /// Unfollow a user
    pub async fn unfollow(&self, actor_id: &str, target_id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await.map_err(|e| ApiError::Database(e))?;

        let deleted = sqlx::query(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
        )
        .bind(actor_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Database(e))?
        .rows_affected();

        if deleted == 0 {
            return Err(ApiError::NotFound("Not following".to_string()));
        }

        sqlx::query("UPDATE users SET following_count = following_count - 1 WHERE id = ?1")
            .bind(actor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        sqlx::query("UPDATE users SET followers_count = followers_count - 1 WHERE id = ?1")
            .bind(target_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Database(e))?;

        tx.commit().await.map_err(|e| ApiError::Database(e))?;

        metrics::SOCIAL_OPERATIONS_TOTAL
            .with_label_values(&["unfollow"])
            .inc();

        Ok(())
    }

    /// Resolve a user's followers for display
    ///
    /// One read per follower id, awaited concurrently. Ids that no longer
    /// resolve are skipped rather than failing the whole list.
    pub async fn followers_list(
        &self,
        user_id: &str,
        viewer_id: &str,
    ) -> ApiResult<Vec<FollowListEntry>> {
        let ids = self.follower_ids(user_id).await?;
        self.resolve_list_entries(ids, viewer_id).await
    }

    /// Resolve the users someone follows, for display
    pub async fn following_list(
        &self,
        user_id: &str,
        viewer_id: &str,
    ) -> ApiResult<Vec<FollowListEntry>> {
        let ids = self.following_ids(user_id).await?;
        self.resolve_list_entries(ids, viewer_id).await
    }

    /// Ids of users following `user_id`
    pub async fn follower_ids(&self, user_id: &str) -> ApiResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        Ok(ids)
    }

    /// Ids of users `user_id` follows
    pub async fn following_ids(&self, user_id: &str) -> ApiResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        Ok(ids)
    }

    /// Recompute a user's follow counters from the edge table
    ///
    /// Kept as an explicit repair operation: transactional writes keep the
    /// counters consistent, but an out-of-band edit can still perturb them.
    pub async fn repair_follow_counts(&self, user_id: &str) -> ApiResult<ProfileStats> {
        sqlx::query(
            "UPDATE users
             SET followers_count = (SELECT COUNT(*) FROM follows WHERE followee_id = users.id),
                 following_count = (SELECT COUNT(*) FROM follows WHERE follower_id = users.id)
             WHERE id = ?1",
        )
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        let row = sqlx::query("SELECT followers_count, following_count FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(ProfileStats {
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
        })
    }

    /// Repair follow counters for every user whose counters drifted
    ///
    /// Returns the number of users corrected.
    pub async fn repair_all_follow_counts(&self) -> ApiResult<u64> {
        let corrected = sqlx::query(
            "UPDATE users
             SET followers_count = (SELECT COUNT(*) FROM follows WHERE followee_id = users.id),
                 following_count = (SELECT COUNT(*) FROM follows WHERE follower_id = users.id)
             WHERE followers_count != (SELECT COUNT(*) FROM follows WHERE followee_id = users.id)
                OR following_count != (SELECT COUNT(*) FROM follows WHERE follower_id = users.id)",
        )
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?
        .rows_affected();

        Ok(corrected)
    }

    /// Fan-out resolution of ids to display entries
    async fn resolve_list_entries(
        &self,
        ids: Vec<String>,
        viewer_id: &str,
    ) -> ApiResult<Vec<FollowListEntry>> {
        let viewer_following: HashSet<String> =
            self.following_ids(viewer_id).await?.into_iter().collect();

        let lookups = join_all(ids.iter().map(|id| self.user_summary(id))).await;

        let entries = lookups
            .into_iter()
            .flatten()
            .flatten()
            .map(|user| {
                let is_following = viewer_following.contains(&user.id);
                FollowListEntry {
                    id: user.id,
                    name: user.name,
                    username: user.username,
                    avatar: user.avatar,
                    is_following,
                }
            })
            .collect();

        Ok(entries)
    }

    /// Single-user display lookup
    async fn user_summary(&self, user_id: &str) -> ApiResult<Option<UserSummary>> {
        let row = sqlx::query(
            "SELECT id, username, display_name, avatar_url FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        Ok(row.map(|row| UserSummary {
            id: row.get("id"),
            username: row.get("username"),
            name: row.get("display_name"),
            avatar: row.get("avatar_url"),
        }))
    }
}
