//! In-memory reference storage.
//!
//! Suitable for tests, the CLI and single-process embedding. Every check-then-act
//! sequence runs under one write lock, so concurrent rotations of the same refresh
//! token cannot both succeed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::{Storage, TokenQuery};
use crate::error::{StorageError, StorageResult};
use crate::models::{Owner, Request, Token, TokenOptions, User};

/// Token type stamped on records stored without one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Interval of the background cleanup task.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

struct UserEntry {
    password_digest: [u8; 32],
    record: User,
}

/// A stored token with the context it was issued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub token: Token,
    pub owner: Owner,
    pub options: TokenOptions,
}

/// In-memory users and tokens. Tokens are keyed by refresh token.
#[derive(Clone)]
pub struct MemoryStorage {
    users: Arc<RwLock<HashMap<String, UserEntry>>>,
    tokens: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn digest(password: &str) -> [u8; 32] {
        Sha256::digest(password.as_bytes()).into()
    }

    /// Register a user that the password grant can authenticate.
    ///
    /// Returns the user record, `{"id": <uuid>, "username": <name>}`. Re-adding a
    /// username replaces its password and id.
    pub async fn add_user(&self, username: impl Into<String>, password: &str) -> User {
        let username = username.into();
        let record = serde_json::json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "username": username,
        });

        self.users.write().await.insert(
            username,
            UserEntry { password_digest: Self::digest(password), record: record.clone() },
        );

        record
    }

    /// Full record for a refresh token.
    pub async fn record(&self, refresh_token: &str) -> Option<TokenRecord> {
        self.tokens.read().await.get(refresh_token).cloned()
    }

    /// Owner of a live access token.
    pub async fn validate_access_token(&self, access_token: &str, now: DateTime<Utc>) -> Option<Owner> {
        let tokens = self.tokens.read().await;
        tokens
            .values()
            .find(|r| r.token.access_token == access_token)
            .filter(|r| !r.token.is_access_expired(now))
            .map(|r| r.owner.clone())
    }

    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Drop records whose access and refresh halves have both expired.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| !(r.token.is_access_expired(now) && r.token.is_refresh_expired(now)));
        let removed = before - tokens.len();
        if removed > 0 {
            tracing::debug!(count = removed, "Cleaned up expired tokens");
        }
        removed
    }

    /// Start background cleanup task for expired tokens.
    ///
    /// Runs once immediately, then every [`CLEANUP_INTERVAL`] until the handle is aborted.
    pub fn start_cleanup_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                self.cleanup_expired(Utc::now()).await;
            }
        })
    }

    fn collides(tokens: &HashMap<String, TokenRecord>, token: &Token) -> bool {
        tokens.contains_key(&token.refresh_token)
            || tokens.contains_key(&token.access_token)
            || tokens.values().any(|r| {
                r.token.access_token == token.access_token || r.token.access_token == token.refresh_token
            })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage").finish()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_user(&self, request: &Request) -> StorageResult<Option<User>> {
        let (Some(username), Some(password)) = (request.body_str("username"), request.body_str("password"))
        else {
            return Ok(None);
        };

        let users = self.users.read().await;
        Ok(users
            .get(username)
            .filter(|entry| entry.password_digest == Self::digest(password))
            .map(|entry| entry.record.clone()))
    }

    async fn get_token(&self, query: &TokenQuery) -> StorageResult<Option<Token>> {
        if query.is_empty() {
            return Ok(None);
        }

        let tokens = self.tokens.read().await;
        let found = match query.get("refresh_token") {
            Some(refresh) => tokens.get(refresh).filter(|r| query.matches(&r.token)),
            None => tokens.values().find(|r| query.matches(&r.token)),
        };
        Ok(found.map(|r| r.token.clone()))
    }

    async fn store_token(
        &self,
        _request: &Request,
        token: &Token,
        owner: &Owner,
        options: &TokenOptions,
    ) -> StorageResult<()> {
        let mut tokens = self.tokens.write().await;
        if Self::collides(&tokens, token) {
            return Err(StorageError::conflict("token string already issued"));
        }

        let mut token = token.clone();
        token.token_type.get_or_insert_with(|| DEFAULT_TOKEN_TYPE.to_owned());
        tokens.insert(
            token.refresh_token.clone(),
            TokenRecord { token, owner: owner.clone(), options: *options },
        );
        Ok(())
    }

    async fn update_token(&self, old: &Token, new: &Token) -> StorageResult<()> {
        let mut tokens = self.tokens.write().await;

        let Some(previous) = tokens.remove(&old.refresh_token) else {
            return Err(StorageError::not_found("refresh token"));
        };
        if previous.token.access_token != old.access_token {
            tokens.insert(old.refresh_token.clone(), previous);
            return Err(StorageError::not_found("refresh token"));
        }
        if Self::collides(&tokens, new) {
            tokens.insert(old.refresh_token.clone(), previous);
            return Err(StorageError::conflict("token string already issued"));
        }

        let mut token = new.clone();
        if token.token_type.is_none() {
            token.token_type = previous.token.token_type.clone();
        }
        let options = TokenOptions {
            access_token_lifetime: Some(new.access_token_lifetime),
            refresh_token_lifetime: Some(new.refresh_token_lifetime),
            ..previous.options
        };
        tokens.insert(token.refresh_token.clone(), TokenRecord { token, owner: previous.owner, options });
        Ok(())
    }

    async fn delete_token(&self, token: &Token) -> StorageResult<()> {
        self.tokens
            .write()
            .await
            .remove(&token.refresh_token)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("refresh token"))
    }
}
