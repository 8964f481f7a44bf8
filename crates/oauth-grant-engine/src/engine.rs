//! Grant exchange state machine and token lifetime policy.
//!
//! A [`GrantEngine`] is immutable once built and can be shared across concurrent
//! requests. Each exchange performs at most one lookup followed by one write
//! against the [`Storage`] it is handed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::{EngineConfig, MAX_TOKEN_LENGTH};
use crate::error::{ConfigError, GrantError, GrantResult, StorageResult};
use crate::generator::TokenGenerator;
use crate::models::{Owner, Request, Token, TokenHalf, TokenKind, TokenOptions};
use crate::storage::{Storage, TokenQuery};

/// Source of the current instant.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Grant types the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
    /// Recognized but not designed yet; always rejected as an invalid grant.
    AuthorizationCode,
    /// Deliberately unsupported.
    ClientCredentials,
}

impl GrantType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl FromStr for GrantType {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(Self::Password),
            "refresh_token" => Ok(Self::RefreshToken),
            "authorization_code" => Ok(Self::AuthorizationCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            other => Err(GrantError::invalid_grant(Some(other))),
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generator and default lifetime for one token half.
#[derive(Debug, Clone, Copy)]
struct HalfPolicy {
    generator: TokenGenerator,
    lifetime: i64,
}

/// Issues, rotates and rejects tokens.
#[derive(Clone)]
pub struct GrantEngine {
    access: HalfPolicy,
    refresh: HalfPolicy,
    clock: Clock,
}

impl GrantEngine {
    /// Build an engine from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfiguration`] if the access lifetime is not
    /// positive, the refresh lifetime is negative, or a length is zero or above
    /// [`MAX_TOKEN_LENGTH`].
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let engine = Self {
            access: HalfPolicy {
                generator: TokenGenerator::new(config.access_length_or_default()),
                lifetime: config.access_lifetime_or_default(),
            },
            refresh: HalfPolicy {
                generator: TokenGenerator::new(config.refresh_length_or_default()),
                lifetime: config.refresh_lifetime_or_default(),
            },
            clock: Arc::new(Utc::now),
        };

        tracing::debug!(
            access_token_lifetime = engine.access.lifetime,
            refresh_token_lifetime = engine.refresh.lifetime,
            access_token_length = engine.access.generator.length(),
            refresh_token_length = engine.refresh.generator.length(),
            "Grant engine configured"
        );

        Ok(engine)
    }

    /// Replace the clock used for expiry computation and checks.
    #[must_use]
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    #[must_use]
    pub const fn access_token_lifetime(&self) -> i64 {
        self.access.lifetime
    }

    #[must_use]
    pub const fn refresh_token_lifetime(&self) -> i64 {
        self.refresh.lifetime
    }

    #[must_use]
    pub const fn access_token_length(&self) -> usize {
        self.access.generator.length()
    }

    #[must_use]
    pub const fn refresh_token_length(&self) -> usize {
        self.refresh.generator.length()
    }

    /// Current instant according to the engine's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    const fn policy(&self, kind: TokenKind) -> &HalfPolicy {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Run one grant exchange.
    ///
    /// Returns `Ok(None)` for ordinary rejections: unknown credentials, a missing or
    /// unknown refresh token, or an expired refresh token.
    ///
    /// A password grant returns the pair as generated, with no `type`. A refresh
    /// grant returns the rotated pair carrying the stored token's `type`.
    ///
    /// # Errors
    ///
    /// - [`GrantError::Unimplemented`] for `client_credentials`
    /// - [`GrantError::InvalidGrant`] for `authorization_code`, unknown or missing grant types
    /// - [`GrantError::RandomSource`] / [`GrantError::Storage`] on infrastructure failure
    pub async fn exchange<S>(
        &self,
        request: &Request,
        storage: &S,
        options: Option<&TokenOptions>,
    ) -> GrantResult<Option<Token>>
    where
        S: Storage + ?Sized,
    {
        let raw = request.grant_type();
        let grant_type = raw.ok_or_else(|| GrantError::invalid_grant(None))?.parse::<GrantType>()?;

        match grant_type {
            GrantType::Password => self.password_grant(request, storage, options).await,
            GrantType::RefreshToken => self.refresh_token_grant(request, storage).await,
            GrantType::ClientCredentials => {
                tracing::warn!(grant_type = %grant_type, "Unsupported grant type requested");
                Err(GrantError::unimplemented(grant_type.as_str()))
            }
            GrantType::AuthorizationCode => Err(GrantError::invalid_grant(raw)),
        }
    }

    async fn password_grant<S>(
        &self,
        request: &Request,
        storage: &S,
        options: Option<&TokenOptions>,
    ) -> GrantResult<Option<Token>>
    where
        S: Storage + ?Sized,
    {
        let Some(user) = missing_as_none(storage.get_user(request).await)? else {
            tracing::debug!("Password grant rejected: credentials did not resolve to a user");
            return Ok(None);
        };

        let options = options.copied().unwrap_or_default();
        let token = self.generate_token(Some(&options))?;
        storage.store_token(request, &token, &Owner::new(user), &options).await?;

        tracing::info!(
            access_token_lifetime = token.access_token_lifetime,
            refresh_token_lifetime = token.refresh_token_lifetime,
            "Issued token pair"
        );

        Ok(Some(token))
    }

    async fn refresh_token_grant<S>(&self, request: &Request, storage: &S) -> GrantResult<Option<Token>>
    where
        S: Storage + ?Sized,
    {
        let Some(refresh_token) = request.body_str("refresh_token") else {
            tracing::debug!("Refresh grant rejected: refresh_token missing or not a string");
            return Ok(None);
        };

        let query = TokenQuery::by_refresh_token(refresh_token);
        let Some(old) = missing_as_none(storage.get_token(&query).await)? else {
            tracing::debug!("Refresh grant rejected: unknown refresh token");
            return Ok(None);
        };

        if old.is_refresh_expired(self.now()) {
            if !applied(storage.delete_token(&old).await)? {
                tracing::debug!("Expired refresh token was already removed");
            }
            tracing::debug!(expired_at = %old.refresh_token_expires_at, "Refresh grant rejected: token expired");
            return Ok(None);
        }

        self.rotate(storage, &old).await
    }

    async fn rotate<S>(&self, storage: &S, old: &Token) -> GrantResult<Option<Token>>
    where
        S: Storage + ?Sized,
    {
        let mut token = self.generate_token(Some(&old.lifetime_options()))?;
        token.token_type.clone_from(&old.token_type);

        if !applied(storage.update_token(old, &token).await)? {
            tracing::debug!("Refresh grant rejected: token was rotated concurrently");
            return Ok(None);
        }

        tracing::info!(
            access_token_lifetime = token.access_token_lifetime,
            refresh_token_lifetime = token.refresh_token_lifetime,
            "Rotated refresh token"
        );

        Ok(Some(token))
    }

    /// Generate a fresh token pair without touching storage.
    ///
    /// Each half takes its lifetime and length from `options` when present and in
    /// range, otherwise from the engine defaults. A lifetime of 0 yields an expiry
    /// equal to the issue instant, which counts as already expired.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::RandomSource`] if the secure random source fails.
    pub fn generate_token(&self, options: Option<&TokenOptions>) -> GrantResult<Token> {
        let now = self.now();
        let [access, refresh] = TokenKind::ALL.map(|kind| self.generate_half(kind, options, now));
        Ok(Token::from_halves(access?, refresh?))
    }

    fn generate_half(
        &self,
        kind: TokenKind,
        options: Option<&TokenOptions>,
        now: DateTime<Utc>,
    ) -> GrantResult<TokenHalf> {
        let policy = self.policy(kind);

        let lifetime = match options.and_then(|o| o.lifetime(kind)) {
            Some(v) if lifetime_in_range(kind, v) => v,
            Some(v) => {
                tracing::warn!(kind = %kind, lifetime = v, "Ignoring out-of-range lifetime override");
                policy.lifetime
            }
            None => policy.lifetime,
        };

        let value = match options.and_then(|o| o.length(kind)) {
            Some(length) if (1..=MAX_TOKEN_LENGTH).contains(&length) => TokenGenerator::generate_with_length(length)?,
            Some(length) => {
                tracing::warn!(kind = %kind, length, "Ignoring out-of-range length override");
                policy.generator.generate()?
            }
            None => policy.generator.generate()?,
        };

        let expires_at = TimeDelta::try_seconds(lifetime)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(TokenHalf { value, expires_at, lifetime })
    }
}

impl fmt::Debug for GrantEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantEngine")
            .field("access", &self.access)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

const fn lifetime_in_range(kind: TokenKind, seconds: i64) -> bool {
    match kind {
        TokenKind::Access => seconds > 0,
        TokenKind::Refresh => seconds >= 0,
    }
}

/// Lookup misses, including a storage-reported `NotFound`, become `None`.
fn missing_as_none<T>(result: StorageResult<Option<T>>) -> GrantResult<Option<T>> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// `false` when the targeted record was already gone.
fn applied(result: StorageResult<()>) -> GrantResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::generator::ALPHABET;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn engine(config: &EngineConfig) -> GrantEngine {
        GrantEngine::new(config).unwrap().with_clock(fixed_now)
    }

    #[test]
    fn test_construction_defaults() {
        let engine = GrantEngine::new(&EngineConfig::default()).unwrap();
        assert_eq!(engine.access_token_lifetime(), 86_400);
        assert_eq!(engine.refresh_token_lifetime(), 0);
        assert_eq!(engine.access_token_length(), 64);
        assert_eq!(engine.refresh_token_length(), 64);
    }

    #[test]
    fn test_construction_rejects_bad_lifetimes() {
        for config in [
            EngineConfig::new().with_access_token_lifetime(0),
            EngineConfig::new().with_access_token_lifetime(-1),
            EngineConfig::new().with_refresh_token_lifetime(-1),
            EngineConfig::new().with_access_token_length(usize::MAX),
            EngineConfig::new().with_refresh_token_length(MAX_TOKEN_LENGTH + 1),
        ] {
            let err = GrantEngine::new(&config).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidConfiguration { .. }), "{config:?}");
        }
    }

    #[test]
    fn test_generate_uses_defaults() {
        let engine = engine(&EngineConfig::new().with_refresh_token_lifetime(7200));
        let token = engine.generate_token(None).unwrap();

        assert_eq!(token.access_token_lifetime, 86_400);
        assert_eq!(token.refresh_token_lifetime, 7200);
        assert_eq!(token.access_token_expires_at, fixed_now() + TimeDelta::seconds(86_400));
        assert_eq!(token.refresh_token_expires_at, fixed_now() + TimeDelta::seconds(7200));
        assert!(token.token_type.is_none());
    }

    #[test]
    fn test_independent_lengths() {
        let engine = engine(&EngineConfig::new().with_access_token_length(16).with_refresh_token_length(128));
        let token = engine.generate_token(None).unwrap();

        assert_eq!(token.access_token.len(), 16);
        assert_eq!(token.refresh_token.len(), 128);
        assert!(token.refresh_token.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_override_lifetimes_and_lengths() {
        let engine = engine(&EngineConfig::default());
        let options = TokenOptions::extended().with_access_token_length(20);
        let token = engine.generate_token(Some(&options)).unwrap();

        assert_eq!(token.access_token_lifetime, 90 * 86_400);
        assert_eq!(token.refresh_token_lifetime, 365 * 86_400);
        assert_eq!(token.access_token.len(), 20);
        assert_eq!(token.refresh_token.len(), 64);
    }

    #[test]
    fn test_out_of_range_override_falls_back() {
        let engine = engine(&EngineConfig::new().with_refresh_token_lifetime(60));
        let options = TokenOptions::new()
            .with_access_token_lifetime(0)
            .with_refresh_token_lifetime(-10)
            .with_refresh_token_length(0);
        let token = engine.generate_token(Some(&options)).unwrap();

        assert_eq!(token.access_token_lifetime, 86_400);
        assert_eq!(token.refresh_token_lifetime, 60);
        assert_eq!(token.refresh_token.len(), 64);
    }

    #[test]
    fn test_oversized_length_override_falls_back() {
        let engine = engine(&EngineConfig::new().with_access_token_length(24));
        let options = TokenOptions::new()
            .with_access_token_length(usize::MAX)
            .with_refresh_token_length(MAX_TOKEN_LENGTH + 1);
        let token = engine.generate_token(Some(&options)).unwrap();

        assert_eq!(token.access_token.len(), 24);
        assert_eq!(token.refresh_token.len(), 64);
    }

    #[test]
    fn test_zero_refresh_lifetime_is_expired_on_issue() {
        let engine = engine(&EngineConfig::default());
        let token = engine.generate_token(None).unwrap();

        assert_eq!(token.refresh_token_expires_at, fixed_now());
        assert!(token.is_refresh_expired(engine.now()));
        assert!(!token.is_access_expired(engine.now()));
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let engine = engine(&EngineConfig::new().with_access_token_lifetime(i64::MAX));
        let token = engine.generate_token(None).unwrap();
        assert_eq!(token.access_token_expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_grant_type_parse() {
        assert_eq!("password".parse::<GrantType>().unwrap(), GrantType::Password);
        assert_eq!("refresh_token".parse::<GrantType>().unwrap(), GrantType::RefreshToken);
        assert_eq!("client_credentials".parse::<GrantType>().unwrap(), GrantType::ClientCredentials);
        assert!(matches!("implicit".parse::<GrantType>(), Err(GrantError::InvalidGrant { .. })));
        assert_eq!(GrantType::AuthorizationCode.to_string(), "authorization_code");
    }
}
