//! OAuth2 Grant Engine
//!
//! Token issuance for an OAuth2-style token endpoint: given a grant request and a
//! pluggable credential store, decide whether to mint a new access/refresh token
//! pair, rotate an existing refresh token, or reject the request.
//!
//! # Features
//!
//! - **Password grant**: authenticates through [`Storage::get_user`] and stores a new pair
//! - **Refresh grant**: rotates live refresh tokens, preserving their lifetime policy;
//!   expired ones are deleted
//! - **Secure tokens**: 64-symbol alphabet drawn from the OS CSPRNG
//! - **Storage-agnostic**: bring your own [`Storage`]; [`MemoryStorage`] is included
//!
//! # Example
//!
//! ```no_run
//! use oauth_grant_engine::{EngineConfig, GrantEngine, MemoryStorage, Request};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = GrantEngine::new(&EngineConfig::from_env()?)?;
//!     let storage = MemoryStorage::new();
//!     storage.add_user("alice", "wonderland").await;
//!
//!     let request = Request::post("/token")
//!         .with_param("grant_type", "password")
//!         .with_param("username", "alice")
//!         .with_param("password", "wonderland");
//!
//!     let token = engine.exchange(&request, &storage, None).await?;
//!     assert!(token.is_some());
//!     Ok(())
//! }
//! ```
//!
//! [`Storage::get_user`]: storage::Storage::get_user

pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod models;
pub mod storage;

pub use config::EngineConfig;
pub use engine::{GrantEngine, GrantType};
pub use error::{ConfigError, GrantError, StorageError};
pub use generator::TokenGenerator;
pub use models::{Owner, Request, Token, TokenKind, TokenOptions};
pub use storage::{MemoryStorage, Storage, TokenQuery};
