/// User profile and social graph endpoints
use crate::{
    api::validate_request,
    auth::AuthContext,
    context::AppContext,
    error::ApiResult,
    feed::FeedItem,
    profile::{FollowListEntry, ProfileView, UpdateProfileRequest, UserSummary},
};
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

/// Build profile routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/users/search", get(search_users))
        .route("/api/users/me", put(update_profile))
        .route("/api/users/:id", get(get_profile))
        .route("/api/users/:id/follow", post(follow_user))
        .route("/api/users/:id/follow", delete(unfollow_user))
        .route("/api/users/:id/followers", get(followers_list))
        .route("/api/users/:id/following", get(following_list))
        .route("/api/users/:id/posts", get(posts_by_user))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Search users by username or display name prefix
async fn search_users(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = ctx.profile_store.search_users(&params.q, &auth.user_id).await?;

    Ok(Json(users))
}

/// Get a user's profile
async fn get_profile(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    let profile = ctx.profile_store.get_profile(&user_id).await?;

    Ok(Json(profile))
}

/// Update the caller's profile
async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileView>> {
    validate_request(&req)?;

    let profile = ctx
        .profile_store
        .update_profile(&auth.user_id, req.name.as_deref(), req.avatar.as_deref())
        .await?;

    Ok(Json(profile))
}

/// Follow a user
async fn follow_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.profile_store.follow(&auth.user_id, &user_id).await?;

    Ok(Json(serde_json::json!({ "following": true })))
}

/// Unfollow a user
async fn unfollow_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.profile_store.unfollow(&auth.user_id, &user_id).await?;

    Ok(Json(serde_json::json!({ "following": false })))
}

/// List a user's followers, resolved for display
async fn followers_list(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<FollowListEntry>>> {
    let entries = ctx
        .profile_store
        .followers_list(&user_id, &auth.user_id)
        .await?;

    Ok(Json(entries))
}

/// List the users someone follows, resolved for display
async fn following_list(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<FollowListEntry>>> {
    let entries = ctx
        .profile_store
        .following_list(&user_id, &auth.user_id)
        .await?;

    Ok(Json(entries))
}

/// A user's posts, newest first
async fn posts_by_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<FeedItem>>> {
    let posts = ctx
        .post_store
        .posts_by_author(&user_id, &auth.user_id)
        .await?;

    Ok(Json(posts))
}
