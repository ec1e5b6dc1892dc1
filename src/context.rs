/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::ApiResult,
    feed::PostStore,
    profile::ProfileStore,
    rate_limit::{RateLimitConfig, RateLimiter},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub profile_store: Arc<ProfileStore>,
    pub post_store: Arc<PostStore>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        // Run migrations
        db::run_migrations(&pool).await?;

        // Test connection
        db::test_connection(&pool).await?;

        let config = Arc::new(config);

        // Initialize services
        let account_manager = Arc::new(AccountManager::new(pool.clone(), Arc::clone(&config)));
        let profile_store = Arc::new(ProfileStore::new(pool.clone()));
        let post_store = Arc::new(PostStore::new(pool.clone()));

        // Initialize rate limiter
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit)));

        Ok(Self {
            config,
            db: pool,
            account_manager,
            profile_store,
            post_store,
            rate_limiter,
        })
    }

    /// Build a context over an existing pool (used by tests)
    pub fn with_pool(config: ServerConfig, pool: SqlitePool) -> Self {
        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(pool.clone(), Arc::clone(&config)));
        let profile_store = Arc::new(ProfileStore::new(pool.clone()));
        let post_store = Arc::new(PostStore::new(pool.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit)));

        Self {
            config,
            db: pool,
            account_manager,
            profile_store,
            post_store,
            rate_limiter,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                crate::error::ApiError::Internal(format!(
                    "Failed to create directory {:?}: {}",
                    dir, e
                ))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
