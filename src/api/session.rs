/// Authentication endpoints
use crate::{
    account::{
        LoginRequest, RefreshSessionRequest, RegisterRequest, SessionInfo, SessionResponse,
    },
    api::{middleware, validate_request},
    context::AppContext,
    error::ApiResult,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};

/// Build session routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/refresh", post(refresh_session))
        .route("/api/auth/session", get(get_session))
}

/// Register endpoint
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<SessionResponse>> {
    validate_request(&req)?;

    tracing::info!("register: Creating account for username: {}", req.username);

    let (user, session) = ctx
        .account_manager
        .register(&req.name, &req.username, &req.email, &req.password)
        .await
        .map_err(|e| {
            tracing::error!("register: Failed to create account: {}", e);
            e
        })?;

    Ok(Json(SessionResponse {
        user_id: user.id,
        username: user.username,
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (user, session) = ctx.account_manager.login(&req.username, &req.password).await?;

    Ok(Json(SessionResponse {
        user_id: user.id,
        username: user.username,
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// Logout endpoint
async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let validated = middleware::require_auth(State(ctx.clone()), headers).await?;

    ctx.account_manager
        .delete_session(&validated.session_id)
        .await?;

    Ok(Json(serde_json::json!({})))
}

/// Refresh session endpoint
async fn refresh_session(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = ctx.account_manager.refresh_session(&req.refresh_token).await?;

    let user = ctx.account_manager.get_user(&session.user_id).await?;

    Ok(Json(SessionResponse {
        user_id: user.id,
        username: user.username,
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// Current session info endpoint
async fn get_session(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionInfo>> {
    let validated = middleware::require_auth(State(ctx.clone()), headers).await?;

    let user = ctx.account_manager.get_user(&validated.user_id).await?;

    Ok(Json(SessionInfo {
        user_id: user.id,
        username: user.username,
        email: user.email,
        name: user.display_name,
    }))
}
