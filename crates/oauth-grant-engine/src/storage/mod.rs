//! Storage contract consumed by the grant engine.
//!
//! The engine never persists anything itself. Implementations own user lookup,
//! token persistence and their own concurrency discipline: the refresh flow is a
//! check-then-act sequence (lookup, then delete or update), so `update_token` and
//! `delete_token` must fail with [`StorageError::NotFound`] when the record they
//! target is already gone rather than silently succeeding twice.
//!
//! [`StorageError::NotFound`]: crate::error::StorageError::NotFound

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{Owner, Request, Token, TokenOptions, User};

pub use memory::MemoryStorage;

/// Persistence interface the engine drives.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Authenticate the credentials carried by `request`.
    ///
    /// Returns `Ok(None)` when they do not resolve to a user.
    async fn get_user(&self, request: &Request) -> StorageResult<Option<User>>;

    /// Find a stored token matching every filter in `query`.
    async fn get_token(&self, query: &TokenQuery) -> StorageResult<Option<Token>>;

    /// Persist a freshly issued token with its owner and the options it was issued with.
    ///
    /// Issued tokens arrive without a `type`. A backend may assign one to the stored
    /// record; the caller of a password grant does not see it, and it first reaches a
    /// caller on the token returned by the next refresh rotation.
    async fn store_token(
        &self,
        request: &Request,
        token: &Token,
        owner: &Owner,
        options: &TokenOptions,
    ) -> StorageResult<()>;

    /// Atomically replace `old` with `new`.
    async fn update_token(&self, old: &Token, new: &Token) -> StorageResult<()>;

    /// Remove a token record.
    async fn delete_token(&self, token: &Token) -> StorageResult<()>;
}

/// Equality filter over stored token fields.
///
/// Recognized fields are `access_token`, `refresh_token` and `type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenQuery {
    filters: BTreeMap<String, String>,
}

impl TokenQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn by_refresh_token(value: impl Into<String>) -> Self {
        Self::new().with("refresh_token", value)
    }

    #[must_use]
    pub fn by_access_token(value: impl Into<String>) -> Self {
        Self::new().with("access_token", value)
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.filters.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// True if `token` satisfies every filter. Unknown fields never match.
    #[must_use]
    pub fn matches(&self, token: &Token) -> bool {
        self.iter().all(|(field, expected)| match field {
            "access_token" => token.access_token == expected,
            "refresh_token" => token.refresh_token == expected,
            "type" => token.token_type.as_deref() == Some(expected),
            _ => false,
        })
    }
}
