//! Per-exchange overrides of lifetime and length policy.

use serde::{Deserialize, Serialize};

use super::token::TokenKind;
use crate::config::lifetimes;

/// Optional per-call overrides of the engine's token policy.
///
/// Unset fields fall back to the engine defaults. Out-of-range values are ignored
/// by the engine rather than rejected, since they usually come from stored records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_length: Option<usize>,
}

impl TokenOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Long-lived tokens for "remember me" style grants (90 days / 365 days).
    #[must_use]
    pub const fn extended() -> Self {
        Self {
            access_token_lifetime: Some(lifetimes::EXTENDED_ACCESS_TOKEN_LIFETIME),
            refresh_token_lifetime: Some(lifetimes::EXTENDED_REFRESH_TOKEN_LIFETIME),
            access_token_length: None,
            refresh_token_length: None,
        }
    }

    #[must_use]
    pub const fn with_access_token_lifetime(mut self, seconds: i64) -> Self {
        self.access_token_lifetime = Some(seconds);
        self
    }

    #[must_use]
    pub const fn with_refresh_token_lifetime(mut self, seconds: i64) -> Self {
        self.refresh_token_lifetime = Some(seconds);
        self
    }

    #[must_use]
    pub const fn with_access_token_length(mut self, length: usize) -> Self {
        self.access_token_length = Some(length);
        self
    }

    #[must_use]
    pub const fn with_refresh_token_length(mut self, length: usize) -> Self {
        self.refresh_token_length = Some(length);
        self
    }

    /// Lifetime override for one token half.
    #[must_use]
    pub const fn lifetime(&self, kind: TokenKind) -> Option<i64> {
        match kind {
            TokenKind::Access => self.access_token_lifetime,
            TokenKind::Refresh => self.refresh_token_lifetime,
        }
    }

    /// Length override for one token half.
    #[must_use]
    pub const fn length(&self, kind: TokenKind) -> Option<usize> {
        match kind {
            TokenKind::Access => self.access_token_length,
            TokenKind::Refresh => self.refresh_token_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_preset() {
        let options = TokenOptions::extended();
        assert_eq!(options.lifetime(TokenKind::Access), Some(90 * 86_400));
        assert_eq!(options.lifetime(TokenKind::Refresh), Some(365 * 86_400));
        assert_eq!(options.length(TokenKind::Access), None);
    }

    #[test]
    fn test_serialization_skips_unset() {
        let json = serde_json::to_value(TokenOptions::new().with_refresh_token_length(32)).unwrap();
        assert_eq!(json, serde_json::json!({"refresh_token_length": 32}));
    }
}
