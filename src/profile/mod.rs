/// Profile and social graph service
///
/// Profile reads/updates, user search, and the follow graph. Follow and
/// unfollow touch one edge row and two counters; all three writes happen in
/// a single transaction so the graph can never be observed half-updated.

mod store;

pub use store::ProfileStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Denormalized follow counters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub followers_count: i64,
    pub following_count: i64,
}

/// Full profile view: user fields plus the edge id lists and counters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub stats: ProfileStats,
}

/// Profile update request (partial)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 512, message = "Avatar URL too long"))]
    pub avatar: Option<String>,
}

/// Entry in a followers/following list, resolved for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowListEntry {
    pub id: String,
    pub name: String,
    pub username: String,
    pub avatar: Option<String>,
    pub is_following: bool,
}

/// Search result entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
}
