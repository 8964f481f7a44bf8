//! Opaque token string generation.
//!
//! Tokens are drawn from a fixed 64-symbol alphabet using the operating system's
//! CSPRNG. One random byte picks one symbol; since 256 is a multiple of 64, the
//! reduction `byte % 64` keeps every symbol equally likely.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::config::DEFAULT_TOKEN_LENGTH;
use crate::error::RandomSourceError;

/// Token alphabet: `[a-zA-Z0-9\-_]`.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

const _: () = assert!(ALPHABET.len() == 64);

/// Generates random token strings of a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenGenerator {
    length: usize,
}

impl TokenGenerator {
    #[must_use]
    pub const fn new(length: usize) -> Self {
        Self { length }
    }

    /// Output length in characters.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Generate a token of the configured length.
    ///
    /// # Errors
    ///
    /// Fails if the OS random source cannot be read. Never falls back to a weaker source.
    pub fn generate(&self) -> Result<String, RandomSourceError> {
        Self::generate_with_length(self.length)
    }

    /// Generate a token of an explicit length.
    pub fn generate_with_length(length: usize) -> Result<String, RandomSourceError> {
        let mut bytes = vec![0u8; length];
        OsRng.try_fill_bytes(&mut bytes)?;

        Ok(bytes.iter().map(|b| ALPHABET[usize::from(*b) % ALPHABET.len()] as char).collect())
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}
