//! Secure random source.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;

/// Supplies cryptographically secure random bytes.
pub trait SecureRandom: Send + Sync {
    /// Fills `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]) -> CryptoResult<()>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSecureRandom;

impl SecureRandom for OsSecureRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> CryptoResult<()> {
        rand::rngs::OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CryptoError::RandomSource(e.to_string()))
    }
}
