//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The secure random source failed.
    #[error("random source failed: {0}")]
    RandomSource(String),

    /// A digest string was not valid hex.
    #[error("invalid digest encoding: {0}")]
    InvalidDigest(#[from] hex::FromHexError),

    /// A digest had the wrong number of bytes.
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    /// Code generation could not produce enough distinct codes.
    #[error("code generation failed: {0}")]
    Generation(String),
}
