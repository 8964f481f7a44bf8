//! Configuration for the grant engine.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Lifetime constants, in seconds.
pub mod lifetimes {
    /// One hour.
    pub const SECONDS_PER_HOUR: i64 = 60 * 60;

    /// One day.
    pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

    /// Default access token lifetime (1 day).
    pub const DEFAULT_ACCESS_TOKEN_LIFETIME: i64 = SECONDS_PER_DAY;

    /// Default refresh token lifetime. Zero means the refresh half expires on issue.
    pub const DEFAULT_REFRESH_TOKEN_LIFETIME: i64 = 0;

    /// Access token lifetime for extended ("remember me") grants: 90 days.
    pub const EXTENDED_ACCESS_TOKEN_LIFETIME: i64 = 90 * SECONDS_PER_DAY;

    /// Refresh token lifetime for extended grants: 365 days.
    pub const EXTENDED_REFRESH_TOKEN_LIFETIME: i64 = 365 * SECONDS_PER_DAY;
}

/// Default generated token length, in characters.
pub const DEFAULT_TOKEN_LENGTH: usize = 64;

/// Longest token the engine will generate, in characters.
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// Environment variable names read by [`EngineConfig::from_env`].
pub mod env {
    pub const ACCESS_TOKEN_LIFETIME: &str = "ACCESS_TOKEN_LIFETIME";
    pub const REFRESH_TOKEN_LIFETIME: &str = "REFRESH_TOKEN_LIFETIME";
    pub const ACCESS_TOKEN_LENGTH: &str = "ACCESS_TOKEN_LENGTH";
    pub const REFRESH_TOKEN_LENGTH: &str = "REFRESH_TOKEN_LENGTH";
}

/// Engine configuration.
///
/// Every option is optional; unset options fall back to the defaults in [`lifetimes`]
/// and [`DEFAULT_TOKEN_LENGTH`]. Unknown keys are ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Access token lifetime in seconds (must be > 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds (must be >= 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,

    /// Generated access token length (1..=[`MAX_TOKEN_LENGTH`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_length: Option<usize>,

    /// Generated refresh token length (1..=[`MAX_TOKEN_LENGTH`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_length: Option<usize>,
}

impl EngineConfig {
    /// Create an empty configuration (all defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Parse configuration from a JSON mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if a recognized key has the wrong type.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but is not an integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (environment, secrets file...).
    ///
    /// # Errors
    ///
    /// Returns error if a present value is not an integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let int = |key: &'static str, field: &'static str| -> Result<Option<i64>, ConfigError> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<i64>()
                        .map_err(|_| ConfigError::invalid(field, format!("must be an integer, got `{raw}`")))
                })
                .transpose()
        };
        let length = |key: &'static str, field: &'static str| -> Result<Option<usize>, ConfigError> {
            int(key, field)?
                .map(|n| usize::try_from(n).map_err(|_| ConfigError::invalid(field, "must be greater than 0")))
                .transpose()
        };

        Ok(Self {
            access_token_lifetime: int(env::ACCESS_TOKEN_LIFETIME, "access_token_lifetime")?,
            refresh_token_lifetime: int(env::REFRESH_TOKEN_LIFETIME, "refresh_token_lifetime")?,
            access_token_length: length(env::ACCESS_TOKEN_LENGTH, "access_token_length")?,
            refresh_token_length: length(env::REFRESH_TOKEN_LENGTH, "refresh_token_length")?,
        })
    }

    /// Check every configured value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfiguration`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(v) = self.access_token_lifetime {
            if v <= 0 {
                return Err(ConfigError::invalid("access_token_lifetime", format!("must be greater than 0, got {v}")));
            }
        }
        if let Some(v) = self.refresh_token_lifetime {
            if v < 0 {
                return Err(ConfigError::invalid("refresh_token_lifetime", format!("must not be negative, got {v}")));
            }
        }
        for (field, length) in
            [("access_token_length", self.access_token_length), ("refresh_token_length", self.refresh_token_length)]
        {
            match length {
                Some(0) => return Err(ConfigError::invalid(field, "must be greater than 0")),
                Some(n) if n > MAX_TOKEN_LENGTH => {
                    return Err(ConfigError::invalid(
                        field,
                        format!("must not exceed {MAX_TOKEN_LENGTH}, got {n}"),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Effective access token lifetime.
    #[must_use]
    pub fn access_lifetime_or_default(&self) -> i64 {
        self.access_token_lifetime.unwrap_or(lifetimes::DEFAULT_ACCESS_TOKEN_LIFETIME)
    }

    /// Effective refresh token lifetime.
    #[must_use]
    pub fn refresh_lifetime_or_default(&self) -> i64 {
        self.refresh_token_lifetime.unwrap_or(lifetimes::DEFAULT_REFRESH_TOKEN_LIFETIME)
    }

    /// Effective access token length.
    #[must_use]
    pub fn access_length_or_default(&self) -> usize {
        self.access_token_length.unwrap_or(DEFAULT_TOKEN_LENGTH)
    }

    /// Effective refresh token length.
    #[must_use]
    pub fn refresh_length_or_default(&self) -> usize {
        self.refresh_token_length.unwrap_or(DEFAULT_TOKEN_LENGTH)
    }
}
