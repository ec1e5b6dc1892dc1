/// Account registration, login, and session lifecycle tests
use perch::{
    account::AccountManager,
    config::{AuthConfig, LoggingConfig, RateLimitSettings, ServerConfig, ServiceConfig, StorageConfig},
    db,
    error::ApiError,
};
use std::sync::Arc;

fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 0,
            version: "test".to_string(),
        },
        storage: StorageConfig {
            data_directory: "./data".into(),
            database: ":memory:".into(),
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
            access_token_ttl: 3600,
            refresh_token_ttl_days: 180,
        },
        rate_limit: RateLimitSettings {
            enabled: false,
            authenticated_rps: 100,
            unauthenticated_rps: 10,
            burst_size: 50,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

async fn test_manager() -> AccountManager {
    let pool = db::create_memory_pool().await.unwrap();
    AccountManager::new(pool, Arc::new(test_config()))
}

#[tokio::test]
async fn register_and_login_round_trip() {
    let manager = test_manager().await;

    let (user, session) = manager
        .register("Alice", "alice", "alice@example.com", "password123")
        .await
        .unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.display_name, "Alice");
    assert_eq!(user.followers_count, 0);
    assert!(!session.access_token.is_empty());

    let (logged_in, _) = manager.login("alice", "password123").await.unwrap();
    assert_eq!(logged_in.id, user.id);
}

#[tokio::test]
async fn username_lookup_is_case_insensitive() {
    let manager = test_manager().await;

    manager
        .register("Alice", "User1", "user1@example.com", "password123")
        .await
        .unwrap();

    // Registered as "User1", stored and matched lower-cased
    let (user, _) = manager.login("user1", "password123").await.unwrap();
    assert_eq!(user.username, "user1");

    let (user, _) = manager.login("USER1", "password123").await.unwrap();
    assert_eq!(user.username, "user1");
}

#[tokio::test]
async fn unknown_username_reports_username_not_found() {
    let manager = test_manager().await;

    let err = manager.login("ghost", "password123").await.unwrap_err();
    match err {
        ApiError::NotFound(msg) => assert_eq!(msg, "Username not found"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let manager = test_manager().await;

    manager
        .register("Alice", "alice", "alice@example.com", "password123")
        .await
        .unwrap();

    let err = manager.login("alice", "wrong-password").await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let manager = test_manager().await;

    manager
        .register("Alice", "alice", "alice@example.com", "password123")
        .await
        .unwrap();

    let err = manager
        .register("Impostor", "Alice", "other@example.com", "password123")
        .await
        .unwrap_err();

    match err {
        ApiError::Conflict(msg) => assert_eq!(msg, "Username is already taken"),
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let manager = test_manager().await;

    manager
        .register("Alice", "alice", "alice@example.com", "password123")
        .await
        .unwrap();

    let err = manager
        .register("Impostor", "alice2", "ALICE@example.com", "password123")
        .await
        .unwrap_err();

    match err {
        ApiError::Conflict(msg) => assert_eq!(msg, "Email is already in use"),
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn username_charset_is_validated() {
    let manager = test_manager().await;

    let err = manager
        .register("Alice", "not a name", "alice@example.com", "password123")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn access_token_validates_until_logout() {
    let manager = test_manager().await;

    let (user, session) = manager
        .register("Alice", "alice", "alice@example.com", "password123")
        .await
        .unwrap();

    let validated = manager
        .validate_access_token(&session.access_token)
        .await
        .unwrap();
    assert_eq!(validated.user_id, user.id);

    manager.delete_session(&validated.session_id).await.unwrap();

    let err = manager
        .validate_access_token(&session.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let manager = test_manager().await;

    let (_, session) = manager
        .register("Alice", "alice", "alice@example.com", "password123")
        .await
        .unwrap();

    let new_session = manager
        .refresh_session(&session.refresh_token)
        .await
        .unwrap();
    assert_ne!(new_session.access_token, session.access_token);

    // Presenting the same refresh token again fails
    let err = manager
        .refresh_session(&session.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
}

#[tokio::test]
async fn cleanup_removes_used_refresh_tokens() {
    let manager = test_manager().await;

    let (_, session) = manager
        .register("Alice", "alice", "alice@example.com", "password123")
        .await
        .unwrap();

    manager.refresh_session(&session.refresh_token).await.unwrap();

    let (_, refresh_tokens) = manager.cleanup_expired_sessions().await.unwrap();
    assert!(refresh_tokens >= 1);
}
