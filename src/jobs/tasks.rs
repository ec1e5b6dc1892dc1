/// Background task implementations
use crate::{context::AppContext, error::ApiResult};

/// Cleanup expired sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> ApiResult<u64> {
    let (sessions_deleted, refresh_tokens_deleted) =
        ctx.account_manager.cleanup_expired_sessions().await?;

    Ok(sessions_deleted + refresh_tokens_deleted)
}

/// Repair follow counters that no longer match the edge table
///
/// Follow writes are transactional, so the sweep only guards against
/// out-of-band edits to the users or follows tables.
pub async fn repair_follow_counts(ctx: &AppContext) -> ApiResult<u64> {
    ctx.profile_store.repair_all_follow_counts().await
}

/// Health check - verify all systems are operational
pub async fn health_check(ctx: &AppContext) -> ApiResult<()> {
    // Check database connectivity
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}
