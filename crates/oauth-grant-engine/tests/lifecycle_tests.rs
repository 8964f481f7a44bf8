//! End-to-end token lifecycle against the in-memory store.
//!
//! Password grant → refresh rotation → reuse of the rotated token, plus expiry
//! and concurrent rotation behaviour.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use oauth_grant_engine::storage::memory::DEFAULT_TOKEN_TYPE;
use oauth_grant_engine::{EngineConfig, GrantEngine, MemoryStorage, Request, TokenOptions};

fn login(username: &str, password: &str) -> Request {
    Request::post("/token")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body(json!({"grant_type": "password", "username": username, "password": password}))
}

fn refresh(refresh_token: &str) -> Request {
    Request::post("/token").with_body(json!({"grant_type": "refresh_token", "refresh_token": refresh_token}))
}

async fn setup(config: EngineConfig) -> (GrantEngine, MemoryStorage) {
    let storage = MemoryStorage::new();
    storage.add_user("alice", "wonderland").await;
    (GrantEngine::new(&config).unwrap(), storage)
}

#[tokio::test]
async fn test_password_then_refresh_rotation() {
    let (engine, storage) = setup(EngineConfig::new().with_refresh_token_lifetime(3600)).await;

    let first = engine.exchange(&login("alice", "wonderland"), &storage, None).await.unwrap().unwrap();
    assert!(first.token_type.is_none());
    assert_eq!(storage.token_count().await, 1);

    let second = engine.exchange(&refresh(&first.refresh_token), &storage, None).await.unwrap().unwrap();
    assert_eq!(second.token_type.as_deref(), Some(DEFAULT_TOKEN_TYPE));
    assert_eq!(second.refresh_token_lifetime, 3600);
    assert_eq!(storage.token_count().await, 1);

    // The rotated-away refresh token is dead.
    assert!(engine.exchange(&refresh(&first.refresh_token), &storage, None).await.unwrap().is_none());

    // The owner follows the token across rotation.
    let owner = storage.validate_access_token(&second.access_token, Utc::now()).await.unwrap();
    assert_eq!(owner.user["username"], "alice");
    assert!(storage.validate_access_token(&first.access_token, Utc::now()).await.is_none());
}

#[tokio::test]
async fn test_wrong_password_yields_no_token() {
    let (engine, storage) = setup(EngineConfig::default()).await;

    let result = engine.exchange(&login("alice", "looking-glass"), &storage, None).await.unwrap();

    assert!(result.is_none());
    assert_eq!(storage.token_count().await, 0);
}

#[tokio::test]
async fn test_default_refresh_lifetime_cannot_rotate() {
    // Refresh lifetime defaults to 0: the refresh half is expired on issue.
    let (engine, storage) = setup(EngineConfig::default()).await;

    let token = engine.exchange(&login("alice", "wonderland"), &storage, None).await.unwrap().unwrap();
    let result = engine.exchange(&refresh(&token.refresh_token), &storage, None).await.unwrap();

    assert!(result.is_none());
    assert_eq!(storage.token_count().await, 0, "expired token should be deleted");
}

#[tokio::test]
async fn test_expired_refresh_token_is_deleted() {
    let (engine, storage) = setup(EngineConfig::new().with_refresh_token_lifetime(60)).await;
    let token = engine.exchange(&login("alice", "wonderland"), &storage, None).await.unwrap().unwrap();

    let later = engine.clone().with_clock(|| Utc::now() + Duration::minutes(5));
    assert!(later.exchange(&refresh(&token.refresh_token), &storage, None).await.unwrap().is_none());
    assert!(storage.record(&token.refresh_token).await.is_none());
}

#[tokio::test]
async fn test_extended_options_survive_rotation() {
    let (engine, storage) = setup(EngineConfig::default()).await;
    let extended = TokenOptions::extended();

    let first = engine.exchange(&login("alice", "wonderland"), &storage, Some(&extended)).await.unwrap().unwrap();
    let record = storage.record(&first.refresh_token).await.unwrap();
    assert_eq!(record.options, extended);

    let second = engine.exchange(&refresh(&first.refresh_token), &storage, None).await.unwrap().unwrap();
    assert_eq!(second.access_token_lifetime, 90 * 86_400);
    assert_eq!(second.refresh_token_lifetime, 365 * 86_400);
}

#[tokio::test]
async fn test_concurrent_rotation_succeeds_once() {
    let (engine, storage) = setup(EngineConfig::new().with_refresh_token_lifetime(3600)).await;
    let engine = Arc::new(engine);
    let storage = Arc::new(storage);

    let token = engine.exchange(&login("alice", "wonderland"), storage.as_ref(), None).await.unwrap().unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let storage = Arc::clone(&storage);
        let request = refresh(&token.refresh_token);
        handles.push(tokio::spawn(async move { engine.exchange(&request, storage.as_ref(), None).await }));
    }

    let mut rotated = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            rotated += 1;
        }
    }

    assert_eq!(rotated, 1);
    assert_eq!(storage.token_count().await, 1);
}

#[tokio::test]
async fn test_engine_is_shareable_across_tasks() {
    let (engine, storage) = setup(EngineConfig::new().with_refresh_token_lifetime(3600)).await;
    let engine = Arc::new(engine);
    let storage = Arc::new(storage);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let storage = Arc::clone(&storage);
            tokio::spawn(async move { engine.exchange(&login("alice", "wonderland"), storage.as_ref(), None).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_some());
    }
    assert_eq!(storage.token_count().await, 16);
}

#[tokio::test]
async fn test_storage_behind_trait_object() {
    let (engine, storage) = setup(EngineConfig::default()).await;
    let dyn_storage: Arc<dyn oauth_grant_engine::Storage> = Arc::new(storage);

    let token = engine.exchange(&login("alice", "wonderland"), dyn_storage.as_ref(), None).await.unwrap();
    assert!(token.is_some());
}
