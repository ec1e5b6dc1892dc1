use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::follow_count_repair_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    crate::metrics::track_background_job("session_cleanup", true);
                    if count > 0 {
                        info!("Cleaned up {} expired tokens (sessions + refresh tokens)", count);
                    } else {
                        info!("Session cleanup: no expired tokens found");
                    }
                }
                Err(e) => {
                    crate::metrics::track_background_job("session_cleanup", false);
                    error!("Failed to cleanup expired sessions: {}", e);
                }
            }
        }
    }

    /// Repair drifted follow counters (runs every 6 hours)
    async fn follow_count_repair_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(21600)); // Every 6 hours

        loop {
            interval.tick().await;
            info!("Running follow counter repair sweep");

            match tasks::repair_follow_counts(&scheduler.context).await {
                Ok(count) => {
                    crate::metrics::track_background_job("follow_count_repair", true);
                    if count > 0 {
                        info!("Repaired follow counters for {} users", count);
                    } else {
                        info!("Follow counter repair: no drift found");
                    }
                }
                Err(e) => {
                    crate::metrics::track_background_job("follow_count_repair", false);
                    error!("Failed to repair follow counters: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - health is good
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
