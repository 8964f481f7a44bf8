//! Error types for the grant engine.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Configuration errors are fatal and only raised while building a [`GrantEngine`];
//! everything else is a per-request result the transport layer is expected to map.
//!
//! [`GrantEngine`]: crate::engine::GrantEngine

/// Errors raised while loading or validating engine configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A recognized option carried an out-of-range value.
    #[error("Invalid configuration: `{field}` {reason}")]
    InvalidConfiguration {
        /// Name of the offending option
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// A recognized option had the wrong JSON shape.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { field, reason: reason.into() }
    }
}

/// The operating system's secure random source could not be read.
#[derive(thiserror::Error, Debug)]
#[error("Secure random source unavailable: {0}")]
pub struct RandomSourceError(#[from] rand::Error);

/// Errors reported by a [`Storage`](crate::storage::Storage) implementation.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The record the operation targets does not exist (anymore).
    #[error("Record not found: {resource}")]
    NotFound {
        /// Description of the missing record
        resource: String,
    },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure (connection, query, serialization...).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a backend error.
    #[must_use]
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend(message.to_string())
    }

    /// Returns true if this is a lookup miss rather than a failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors from a grant exchange.
#[derive(thiserror::Error, Debug)]
pub enum GrantError {
    /// Missing, unrecognized, or not-yet-designed grant type.
    #[error("Invalid grant: {}", grant_type.as_deref().unwrap_or("<missing grant_type>"))]
    InvalidGrant {
        /// The grant type the request carried, if any
        grant_type: Option<String>,
    },

    /// Recognized grant type that is deliberately unsupported.
    #[error("Unimplemented grant type: {grant_type}")]
    Unimplemented {
        /// The grant type the request carried
        grant_type: String,
    },

    /// Secure random source failure while generating a token.
    #[error(transparent)]
    RandomSource(#[from] RandomSourceError),

    /// Storage failure other than a lookup miss.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl GrantError {
    /// Create an invalid grant error.
    #[must_use]
    pub fn invalid_grant(grant_type: Option<&str>) -> Self {
        Self::InvalidGrant { grant_type: grant_type.map(str::to_owned) }
    }

    /// Create an unimplemented grant error.
    #[must_use]
    pub fn unimplemented(grant_type: impl Into<String>) -> Self {
        Self::Unimplemented { grant_type: grant_type.into() }
    }

    /// RFC 6749 error code a transport should answer with.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::Unimplemented { .. } => "unsupported_grant_type",
            Self::RandomSource(_) | Self::Storage(_) => "server_error",
        }
    }

    /// Returns true if the request itself was at fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidGrant { .. } | Self::Unimplemented { .. })
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for grant exchanges.
pub type GrantResult<T> = Result<T, GrantError>;
