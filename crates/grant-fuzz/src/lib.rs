//! Fuzzing library for oauth-grant-engine.
//!
//! This crate provides fuzzing targets for the JSON shapes that cross the engine
//! boundary: grant requests, stored tokens and engine configuration.
//!
//! # Usage
//!
//! ```bash
//! cd crates/grant-fuzz
//! cargo +nightly fuzz run fuzz_request_parse -- -max_total_time=60
//! ```

pub use oauth_grant_engine::{EngineConfig, GrantEngine, models};
