//! SHA-256 digests of canonical codes.

use crate::error::{CryptoError, CryptoResult};
use promogate_types::CanonicalCode;
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// Size of a code digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// The SHA-256 digest of a canonical code.
///
/// Equality is constant-time.
#[derive(Clone, Copy, Eq)]
pub struct CodeDigest([u8; DIGEST_SIZE]);

impl CodeDigest {
    /// Hashes a canonical code.
    #[must_use]
    pub fn of(code: &CanonicalCode) -> Self {
        Self(Sha256::digest(code.as_bytes()).into())
    }

    /// Creates a digest from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses a lowercase or uppercase hex digest.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim())?;
        let actual = bytes.len();
        let array: [u8; DIGEST_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidDigestLength {
                    expected: DIGEST_SIZE,
                    actual,
                })?;
        Ok(Self(array))
    }

    /// Returns the lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

impl PartialEq for CodeDigest {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl ConstantTimeEq for CodeDigest {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl AsRef<[u8]> for CodeDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CodeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeDigest({})", self.to_hex())
    }
}
