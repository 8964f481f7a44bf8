//! Issued token records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::TokenOptions;

/// Opaque user record returned by storage. The engine never inspects it.
pub type User = serde_json::Value;

/// The two halves of a token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Both halves, in generation order.
    pub const ALL: [Self; 2] = [Self::Access, Self::Refresh];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated half, before it is paired up.
#[derive(Debug, Clone)]
pub(crate) struct TokenHalf {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub lifetime: i64,
}

/// An access/refresh token pair.
///
/// Both halves are generated together; rotation replaces the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    /// Seconds; kept so a later rotation can reuse it.
    pub access_token_lifetime: i64,
    /// Seconds; kept so a later rotation can reuse it.
    pub refresh_token_lifetime: i64,
    /// Token type, assigned by storage and carried over on rotation.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Token {
    pub(crate) fn from_halves(access: TokenHalf, refresh: TokenHalf) -> Self {
        Self {
            access_token: access.value,
            refresh_token: refresh.value,
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
            access_token_lifetime: access.lifetime,
            refresh_token_lifetime: refresh.lifetime,
            token_type: None,
        }
    }

    /// Token string of one half.
    #[must_use]
    pub fn value(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_token,
            TokenKind::Refresh => &self.refresh_token,
        }
    }

    #[must_use]
    pub const fn expires_at(&self, kind: TokenKind) -> DateTime<Utc> {
        match kind {
            TokenKind::Access => self.access_token_expires_at,
            TokenKind::Refresh => self.refresh_token_expires_at,
        }
    }

    #[must_use]
    pub const fn lifetime(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_token_lifetime,
            TokenKind::Refresh => self.refresh_token_lifetime,
        }
    }

    /// A half whose expiry instant is at or before `now` is expired.
    #[must_use]
    pub fn is_expired(&self, kind: TokenKind, now: DateTime<Utc>) -> bool {
        self.expires_at(kind) <= now
    }

    #[must_use]
    pub fn is_access_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_expired(TokenKind::Access, now)
    }

    #[must_use]
    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_expired(TokenKind::Refresh, now)
    }

    /// Lifetimes of this token as an override, so a rotation preserves its policy.
    #[must_use]
    pub const fn lifetime_options(&self) -> TokenOptions {
        TokenOptions {
            access_token_lifetime: Some(self.access_token_lifetime),
            refresh_token_lifetime: Some(self.refresh_token_lifetime),
            access_token_length: None,
            refresh_token_length: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }
}

/// Who a token was issued to. Attached at creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user: User,
}

impl Owner {
    #[must_use]
    pub const fn new(user: User) -> Self {
        Self { user }
    }
}
