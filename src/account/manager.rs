/// Account manager implementation using runtime queries
///
/// Registration writes the identity and profile fields as a single atomic
/// insert, so a failure can never leave an identity without a profile. The
/// UNIQUE constraints on username and email back up the pre-insert checks,
/// which only exist to produce friendly errors.

use crate::{
    account::ValidatedSession,
    config::ServerConfig,
    db::models::{Session, User},
    error::{ApiError, ApiResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    sid: String,
    iat: i64,
    exp: i64,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new user
    ///
    /// Username and email are lower-cased before any check or write, so a
    /// user registered as "User1" can log in as "user1".
    pub async fn register(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<(User, Session)> {
        let username = username.trim().to_lowercase();
        let email = email.trim().to_lowercase();

        self.validate_username(&username)?;

        // Check if email already exists
        if self.email_exists(&email).await? {
            return Err(ApiError::Conflict("Email is already in use".to_string()));
        }

        // Check if username already exists
        if self.username_exists(&username).await? {
            return Err(ApiError::Conflict("Username is already taken".to_string()));
        }

        let password_hash = Self::hash_password(password)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, display_name, avatar_url,
                                followers_count, following_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7, ?8)",
        )
        .bind(&id)
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(name)
        .bind(Option::<String>::None)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            // The pre-checks race against concurrent registrations; the
            // UNIQUE constraints are authoritative.
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("Username is already taken".to_string())
            }
            _ => ApiError::Database(e),
        })?;

        let user = User {
            id: id.clone(),
            username,
            email,
            password_hash,
            display_name: name.to_string(),
            avatar_url: None,
            followers_count: 0,
            following_count: 0,
            created_at: now,
            updated_at: now,
        };

        let session = self.create_session(&id).await?;

        Ok((user, session))
    }

    /// Authenticate by username and create a session
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<(User, Session)> {
        let username = username.trim().to_lowercase();

        let user = self
            .get_user_by_username(&username)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::NotFound("Username not found".to_string()),
                other => other,
            })?;

        let valid = Self::verify_password(password, &user.password_hash);
        if !valid {
            return Err(ApiError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&user.id).await?;

        Ok((user, session))
    }

    /// Create a session for a user
    pub async fn create_session(&self, user_id: &str) -> ApiResult<Session> {
        let session_id = Uuid::new_v4().to_string();

        let access_token = self.generate_access_token(user_id, &session_id)?;
        let refresh_token_str = Uuid::new_v4().to_string();

        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.auth.access_token_ttl as i64);

        sqlx::query(
            "INSERT INTO sessions (id, user_id, access_token, refresh_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(&access_token)
        .bind(&refresh_token_str)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        // Store refresh token
        let refresh_token_id = Uuid::new_v4().to_string();
        let refresh_expires = now + Duration::days(self.config.auth.refresh_token_ttl_days as i64);

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&refresh_token_id)
        .bind(user_id)
        .bind(&refresh_token_str)
        .bind(now)
        .bind(refresh_expires)
        .bind(false)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        Ok(Session {
            id: session_id,
            user_id: user_id.to_string(),
            access_token,
            refresh_token: refresh_token_str,
            created_at: now,
            expires_at,
        })
    }

    /// Validate access token and return session info
    pub async fn validate_access_token(&self, token: &str) -> ApiResult<ValidatedSession> {
        let row = sqlx::query("SELECT id, user_id, expires_at FROM sessions WHERE access_token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?
            .ok_or_else(|| {
                ApiError::Authentication("Invalid or expired session".to_string())
            })?;

        let session_id: String = row.get("id");
        let user_id: String = row.get("user_id");
        let expires_at: DateTime<Utc> = row.get("expires_at");

        if Utc::now() > expires_at {
            return Err(ApiError::Authentication("Session expired".to_string()));
        }

        Ok(ValidatedSession {
            user_id,
            session_id,
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, session_id: &str) -> ApiResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        Ok(())
    }

    /// Refresh session tokens
    ///
    /// Refresh tokens are single-use: the presented token is marked used and
    /// a new session (with a new refresh token) is issued.
    pub async fn refresh_session(&self, refresh_token: &str) -> ApiResult<Session> {
        let row = sqlx::query(
            "SELECT id, user_id, expires_at, used FROM refresh_tokens WHERE token = ?1",
        )
        .bind(refresh_token)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?
        .ok_or_else(|| ApiError::Authentication("Invalid refresh token".to_string()))?;

        let token_id: String = row.get("id");
        let user_id: String = row.get("user_id");
        let expires_at: DateTime<Utc> = row.get("expires_at");
        let used: bool = row.get("used");

        if used {
            return Err(ApiError::Authentication(
                "Refresh token already used".to_string(),
            ));
        }

        if Utc::now() > expires_at {
            return Err(ApiError::Authentication("Refresh token expired".to_string()));
        }

        sqlx::query("UPDATE refresh_tokens SET used = TRUE, used_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(&token_id)
            .execute(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        self.create_session(&user_id).await
    }

    /// Get user by id
    pub async fn get_user(&self, user_id: &str) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, display_name, avatar_url,
                    followers_count, following_count, created_at, updated_at
             FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    /// Get user by lower-cased username
    pub async fn get_user_by_username(&self, username: &str) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, display_name, avatar_url,
                    followers_count, following_count, created_at, updated_at
             FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    /// Delete expired sessions and refresh tokens
    ///
    /// Returns (sessions deleted, refresh tokens deleted).
    pub async fn cleanup_expired_sessions(&self) -> ApiResult<(u64, u64)> {
        let now = Utc::now();

        let sessions = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?
            .rows_affected();

        let refresh_tokens =
            sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?1 OR used = TRUE")
                .bind(now)
                .execute(&self.db)
                .await
                .map_err(|e| ApiError::Database(e))?
                .rows_affected();

        Ok((sessions, refresh_tokens))
    }

    /// Check if username exists
    async fn username_exists(&self, username: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        Ok(count > 0)
    }

    /// Check if email exists
    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        Ok(count > 0)
    }

    /// Validate username format
    fn validate_username(&self, username: &str) -> ApiResult<()> {
        if username.len() < 3 {
            return Err(ApiError::Validation(
                "Username must be at least 3 characters".to_string(),
            ));
        }

        if username.len() > 32 {
            return Err(ApiError::Validation("Username too long".to_string()));
        }

        if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ApiError::Validation(
                "Username contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Hash a password with Argon2id
    fn hash_password(password: &str) -> ApiResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against an Argon2id hash
    fn verify_password(password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Generate a signed JWT access token
    fn generate_access_token(&self, user_id: &str, session_id: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.auth.access_token_ttl as i64)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Token generation failed: {}", e)))
    }
}
