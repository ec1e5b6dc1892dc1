/// API routes and handlers
pub mod feed;
pub mod health;
pub mod middleware;
pub mod profile;
pub mod session;

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use axum::Router;
use validator::Validate;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(session::routes())
        .merge(profile::routes())
        .merge(feed::routes())
        .merge(health::routes())
}

/// Run declarative request validation, folding failures into one message
pub(crate) fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate().map_err(|e| {
        let message = e
            .field_errors()
            .into_iter()
            .flat_map(|(_, errors)| errors.iter())
            .filter_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .collect::<Vec<_>>()
            .join("; ");

        if message.is_empty() {
            ApiError::Validation("Invalid request".to_string())
        } else {
            ApiError::Validation(message)
        }
    })
}
