/// Health check endpoints for liveness and readiness probes
use crate::{context::AppContext, db, metrics};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,

    /// Application version
    pub version: String,

    /// Individual component checks
    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,

    /// Status: "healthy" or "unhealthy"
    pub status: String,

    /// Optional error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(metrics_endpoint))
}

/// Basic health check
async fn health_basic(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": ctx.config.service.version,
    }))
}

/// Liveness probe: the process is alive
async fn liveness_probe() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: the service can reach its database
async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<HealthStatus>, (StatusCode, Json<HealthStatus>)> {
    let db_check = match db::test_connection(&ctx.db).await {
        Ok(()) => ComponentHealth {
            name: "database".to_string(),
            status: "healthy".to_string(),
            error: None,
        },
        Err(e) => ComponentHealth {
            name: "database".to_string(),
            status: "unhealthy".to_string(),
            error: Some(e.to_string()),
        },
    };

    let healthy = db_check.status == "healthy";
    let status = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: ctx.config.service.version.clone(),
        checks: vec![db_check],
    };

    if healthy {
        Ok(Json(status))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(status)))
    }
}

/// Prometheus text-format metrics
async fn metrics_endpoint() -> String {
    metrics::gather_metrics()
}
