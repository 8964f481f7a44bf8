//! Data models for grant exchanges.
//!
//! All models implement Serde traits. Tokens use the snake_case field names storage
//! layers persist (`access_token_expires_at`, ...) and a `type` key for the token type.

mod options;
mod request;
mod token;

pub use options::TokenOptions;
pub use request::Request;
pub use token::{Owner, Token, TokenKind, User};
pub(crate) use token::TokenHalf;
