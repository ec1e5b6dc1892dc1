/// Post, feed, like, and comment endpoints
use crate::{
    api::validate_request,
    auth::AuthContext,
    context::AppContext,
    error::ApiResult,
    feed::{CommentView, CreateCommentRequest, CreatePostRequest, FeedItem},
};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};

/// Build feed routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/posts", post(create_post))
        .route("/api/posts/:id", get(get_post))
        .route("/api/posts/:id/like", post(like_post))
        .route("/api/posts/:id/like", delete(unlike_post))
        .route("/api/posts/:id/comments", get(get_comments))
        .route("/api/posts/:id/comments", post(create_comment))
        .route("/api/feed", get(home_feed))
        .route("/api/feed/following", get(following_feed))
}

/// Create a post
async fn create_post(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<Json<FeedItem>> {
    validate_request(&req)?;

    let post = ctx
        .post_store
        .create_post(&auth.user_id, &req.content, req.media_url.as_deref())
        .await?;

    Ok(Json(post))
}

/// Get a single post
async fn get_post(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(post_id): Path<String>,
) -> ApiResult<Json<FeedItem>> {
    let post = ctx.post_store.get_post(&post_id, &auth.user_id).await?;

    Ok(Json(post))
}

/// Home timeline: everyone else's posts, newest first
async fn home_feed(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<FeedItem>>> {
    let posts = ctx.post_store.timeline(&auth.user_id).await?;

    Ok(Json(posts))
}

/// Following timeline: posts from followed users, newest first
async fn following_feed(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<FeedItem>>> {
    let following = ctx.profile_store.following_ids(&auth.user_id).await?;

    let posts = ctx
        .post_store
        .following_timeline(&auth.user_id, &following)
        .await?;

    Ok(Json(posts))
}

/// Toggle a like on a post
async fn like_post(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(post_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let action = ctx.post_store.toggle_like(&post_id, &auth.user_id).await?;

    Ok(Json(serde_json::json!({ "action": action.as_str() })))
}

/// Remove a like from a post
async fn unlike_post(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(post_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.post_store.unlike(&post_id, &auth.user_id).await?;

    Ok(Json(serde_json::json!({ "action": "unliked" })))
}

/// Comments on a post, oldest first
async fn get_comments(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let comments = ctx.post_store.comments_for_post(&post_id).await?;

    Ok(Json(comments))
}

/// Create a comment on a post
async fn create_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<Json<CommentView>> {
    validate_request(&req)?;

    let comment = ctx
        .post_store
        .create_comment(&post_id, &auth.user_id, &req.content)
        .await?;

    Ok(Json(comment))
}
