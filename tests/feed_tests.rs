/// Feed assembly, like toggle, and comment aggregation tests
use chrono::{DateTime, Duration, Utc};
use perch::{
    db,
    error::ApiError,
    feed::{LikeAction, PostStore},
    metrics,
    profile::ProfileStore,
};
use sqlx::SqlitePool;
use uuid::Uuid;

async fn test_stores() -> (PostStore, ProfileStore, SqlitePool) {
    let pool = db::create_memory_pool().await.unwrap();
    (
        PostStore::new(pool.clone()),
        ProfileStore::new(pool.clone()),
        pool,
    )
}

/// Insert a user row directly, skipping registration
async fn insert_user(pool: &SqlitePool, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, display_name, avatar_url,
                            followers_count, following_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'x', ?4, NULL, 0, 0, ?5, ?5)",
    )
    .bind(&id)
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(username)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();

    id
}

/// Insert a post row with an explicit creation time
async fn insert_post(
    pool: &SqlitePool,
    author_id: &str,
    content: &str,
    created_at: DateTime<Utc>,
) -> String {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO posts (id, author_id, content, media_url,
                            like_count, comment_count, repost_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, NULL, 0, 0, 0, ?4, ?4)",
    )
    .bind(&id)
    .bind(author_id)
    .bind(content)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();

    id
}

async fn like_count(pool: &SqlitePool, post_id: &str) -> i64 {
    sqlx::query_scalar("SELECT like_count FROM posts WHERE id = ?1")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn oversized_post_is_rejected_before_any_write() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;

    let content = "x".repeat(281);
    let err = posts.create_post(&alice, &content, None).await.unwrap_err();

    match err {
        ApiError::Validation(msg) => assert!(msg.contains("cannot exceed 280 characters")),
        other => panic!("expected Validation, got {:?}", other),
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "nothing may be written for an invalid post");
}

#[tokio::test]
async fn post_of_exactly_280_chars_is_accepted() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;

    let content = "x".repeat(280);
    let post = posts.create_post(&alice, &content, None).await.unwrap();

    assert_eq!(post.content.chars().count(), 280);
    assert_eq!(post.state.likes, 0);
    assert_eq!(post.state.comments, 0);
    assert_eq!(post.state.retweets, 0);
}

#[tokio::test]
async fn home_timeline_excludes_own_posts_and_sorts_newest_first() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;

    let now = Utc::now();
    insert_post(&pool, &alice, "mine", now).await;
    insert_post(&pool, &bob, "older", now - Duration::minutes(10)).await;
    insert_post(&pool, &bob, "newer", now - Duration::minutes(1)).await;

    let feed = posts.timeline(&alice).await.unwrap();

    assert_eq!(feed.len(), 2, "own posts are excluded");
    assert_eq!(feed[0].content, "newer");
    assert_eq!(feed[1].content, "older");
    assert!(feed.iter().all(|item| item.author_id == bob));
}

#[tokio::test]
async fn feed_items_are_display_ready() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;

    insert_post(&pool, &bob, "hello", Utc::now() - Duration::minutes(2)).await;

    let feed = posts.timeline(&alice).await.unwrap();
    let item = &feed[0];

    assert_eq!(item.author_name, "bob");
    assert_eq!(item.author_username, "bob");
    assert_eq!(item.time, "2m");
    assert!(!item.user_liked);
}

// Both halves read the global chunk-query counter, so they run as one
// sequential test instead of racing in parallel.
#[tokio::test]
async fn following_feed_short_circuits_then_chunks_by_ten() {
    let (posts, profiles, pool) = test_stores().await;
    let viewer = insert_user(&pool, "viewer").await;

    // Following nobody: empty result, zero post queries
    let following = profiles.following_ids(&viewer).await.unwrap();
    assert!(following.is_empty());

    let before = metrics::FEED_CHUNK_QUERIES_TOTAL.get();
    let feed = posts.following_timeline(&viewer, &following).await.unwrap();
    let after = metrics::FEED_CHUNK_QUERIES_TOTAL.get();

    assert!(feed.is_empty());
    assert_eq!(after, before, "no chunk query may be issued");

    // 25 followed authors, posts interleaved in time so that concatenated
    // per-chunk results are not globally ordered
    let now = Utc::now();
    let mut authors = Vec::new();
    for i in 0..25 {
        let author = insert_user(&pool, &format!("author{}", i)).await;
        let age_minutes = ((i * 7) % 25 + 1) as i64;
        insert_post(
            &pool,
            &author,
            &format!("post {}", i),
            now - Duration::minutes(age_minutes),
        )
        .await;
        authors.push(author);
    }

    let before = metrics::FEED_CHUNK_QUERIES_TOTAL.get();
    let feed = posts.following_timeline(&viewer, &authors).await.unwrap();
    let after = metrics::FEED_CHUNK_QUERIES_TOTAL.get();

    assert_eq!(after - before, 3, "25 ids are queried as 10 + 10 + 5");
    assert_eq!(feed.len(), 25);

    for pair in feed.windows(2) {
        assert!(
            pair[0].created_at >= pair[1].created_at,
            "merged feed must be sorted newest first"
        );
    }
}

#[tokio::test]
async fn like_then_unlike_restores_counter() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let post = insert_post(&pool, &bob, "hello", Utc::now()).await;

    assert_eq!(like_count(&pool, &post).await, 0);

    let action = posts.toggle_like(&post, &alice).await.unwrap();
    assert_eq!(action, LikeAction::Liked);
    assert_eq!(like_count(&pool, &post).await, 1);
    assert!(posts.user_liked(&post, &alice).await.unwrap());

    posts.unlike(&post, &alice).await.unwrap();
    assert_eq!(like_count(&pool, &post).await, 0);
    assert!(!posts.user_liked(&post, &alice).await.unwrap());
}

#[tokio::test]
async fn second_like_toggles_off() {
    // With the unique like row and transactional counter update, a repeated
    // like cannot double-increment the counter; the second call observes the
    // first and toggles instead.
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let post = insert_post(&pool, &bob, "hello", Utc::now()).await;

    let first = posts.toggle_like(&post, &alice).await.unwrap();
    let second = posts.toggle_like(&post, &alice).await.unwrap();

    assert_eq!(first, LikeAction::Liked);
    assert_eq!(second, LikeAction::Unliked);
    assert_eq!(like_count(&pool, &post).await, 0);
}

#[tokio::test]
async fn unlike_without_like_is_not_found() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let post = insert_post(&pool, &bob, "hello", Utc::now()).await;

    let err = posts.unlike(&post, &alice).await.unwrap_err();
    match err {
        ApiError::NotFound(msg) => assert_eq!(msg, "Like not found"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn like_on_missing_post_is_not_found() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;

    let err = posts.toggle_like("missing-post", &alice).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn comment_and_counter_commit_together() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let post = insert_post(&pool, &bob, "hello", Utc::now()).await;

    let comment = posts
        .create_comment(&post, &alice, "first!")
        .await
        .unwrap();
    assert_eq!(comment.author_username, "alice");
    assert_eq!(comment.content, "first!");

    let comment_count: i64 = sqlx::query_scalar("SELECT comment_count FROM posts WHERE id = ?1")
        .bind(&post)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(comment_count, 1);

    let comments = posts.comments_for_post(&post).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, comment.id);
}

#[tokio::test]
async fn comments_are_listed_oldest_first_per_post() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let post = insert_post(&pool, &bob, "hello", Utc::now()).await;
    let other_post = insert_post(&pool, &bob, "unrelated", Utc::now()).await;

    posts.create_comment(&post, &alice, "one").await.unwrap();
    posts.create_comment(&post, &bob, "two").await.unwrap();
    posts
        .create_comment(&other_post, &alice, "elsewhere")
        .await
        .unwrap();

    let comments = posts.comments_for_post(&post).await.unwrap();
    assert_eq!(comments.len(), 2, "only this post's comments are returned");
    assert_eq!(comments[0].content, "one");
    assert_eq!(comments[1].content, "two");
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;

    let err = posts
        .create_comment("missing-post", &alice, "hello")
        .await
        .unwrap_err();
    match err {
        ApiError::NotFound(msg) => assert_eq!(msg, "Post not found"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_comment_is_rejected() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let post = insert_post(&pool, &bob, "hello", Utc::now()).await;

    let err = posts.create_comment(&post, &alice, "   ").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn deleted_author_degrades_to_placeholder_fields() {
    let (posts, _, pool) = test_stores().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    insert_post(&pool, &bob, "orphaned", Utc::now()).await;

    // Detach the post from its author; foreign keys are switched off for
    // the update so the orphan can exist at all
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE posts SET author_id = 'gone' WHERE author_id = ?1")
        .bind(&bob)
        .execute(&pool)
        .await
        .unwrap();

    let feed = posts.timeline(&alice).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].author_name, "User");
    assert_eq!(feed[0].author_username, "user");
    assert_eq!(feed[0].author_avatar, None);
}
