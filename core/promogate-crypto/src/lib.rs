//! Hashing, constant-time matching and secure code generation for Promogate.
//!
//! # Security properties
//!
//! - **Digests only**: valid codes ship as SHA-256 digests, never plaintext
//! - **Uniform timing**: set membership visits every element and comparisons
//!   never exit early, so response time does not reveal how close a guess was
//! - **Unbiased generation**: codes are drawn by rejection sampling from the
//!   OS random source
//!
//! The [`AccessIntegrityToken`] is an unkeyed digest. It detects casual edits
//! to persisted entitlement state, not a determined attacker who can read the
//! code.

mod digest;
mod error;
mod generator;
mod integrity;
mod matcher;
mod random;

pub use digest::{CodeDigest, DIGEST_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use generator::{CodeGenerator, BODY_LEN, CODE_ALPHABET};
pub use integrity::{AccessIntegrityToken, EntitlementFacts};
pub use matcher::{bytes_equal, set_contains, strings_equal};
pub use random::{OsSecureRandom, SecureRandom};
