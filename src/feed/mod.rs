/// Feed assembly: posts, likes, and comments
///
/// Feed items are display-ready: raw post fields plus the author's display
/// fields, the caller's like state, and a derived relative-time string.

mod store;

pub use store::{LikeAction, PostStore, FOLLOW_QUERY_CHUNK_SIZE};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Post creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(max = 280, message = "Post content cannot exceed 280 characters"))]
    pub content: String,
    #[validate(length(max = 512, message = "Media URL too long"))]
    pub media_url: Option<String>,
}

/// Comment creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(max = 280, message = "Comment cannot exceed 280 characters"))]
    pub content: String,
}

/// Denormalized engagement counters on a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub likes: i64,
    pub comments: i64,
    pub retweets: i64,
}

/// Display-ready feed item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: EngagementCounts,
    pub author_name: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub time: String,
    pub user_liked: bool,
}

/// Display-ready comment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub time: String,
}

/// Format a timestamp as a compact relative age: "5m", "3h", "12d"
///
/// Minutes under an hour, hours under a day, days otherwise.
pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - timestamp).num_milliseconds().max(0);
    let minutes = diff_ms / 60_000;
    let hours = diff_ms / 3_600_000;
    let days = diff_ms / 86_400_000;

    if minutes < 60 {
        format!("{}m", minutes)
    } else if hours < 24 {
        format!("{}h", hours)
    } else {
        format!("{}d", days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn relative_time_minutes() {
        let now = base();
        let t = now - chrono::Duration::milliseconds(125_000);
        assert_eq!(format_relative_time(t, now), "2m");
    }

    #[test]
    fn relative_time_zero_minutes() {
        let now = base();
        assert_eq!(format_relative_time(now, now), "0m");
    }

    #[test]
    fn relative_time_hour_boundary() {
        let now = base();
        let t = now - chrono::Duration::minutes(59);
        assert_eq!(format_relative_time(t, now), "59m");

        let t = now - chrono::Duration::minutes(60);
        assert_eq!(format_relative_time(t, now), "1h");
    }

    #[test]
    fn relative_time_day_boundary() {
        let now = base();
        let t = now - chrono::Duration::hours(23);
        assert_eq!(format_relative_time(t, now), "23h");

        let t = now - chrono::Duration::hours(24);
        assert_eq!(format_relative_time(t, now), "1d");

        let t = now - chrono::Duration::days(12);
        assert_eq!(format_relative_time(t, now), "12d");
    }

    #[test]
    fn relative_time_future_timestamp_clamps_to_zero() {
        let now = base();
        let t = now + chrono::Duration::minutes(5);
        assert_eq!(format_relative_time(t, now), "0m");
    }
}
