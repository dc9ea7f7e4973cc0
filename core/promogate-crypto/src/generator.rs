//! Offline promo code generation.
//!
//! Generation is an administrative task: codes are minted, their digests are
//! compiled into the registry, and the plaintext is handed to distribution.
//! It never runs on the redemption path.
//!
//! Bodies are drawn from a 31-character alphabet without look-alike glyphs
//! (no `0`, `O`, `1`, `I`, `L`). Random bytes at or above
//! `floor(256 / 31) * 31 = 248` are discarded to avoid modulo bias.

use crate::error::{CryptoError, CryptoResult};
use crate::random::SecureRandom;
use promogate_types::{CanonicalCode, CodeType};
use std::collections::BTreeSet;

/// Characters a generated code body may contain.
pub const CODE_ALPHABET: &[u8; 31] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Number of random characters after the type prefix.
pub const BODY_LEN: usize = 8;

const REJECTION_MAX: u8 = (256 / CODE_ALPHABET.len() * CODE_ALPHABET.len()) as u8;

/// Random buffers one code may consume before generation gives up.
const MAX_REFILLS: usize = 64;

/// Mints new codes from a secure random source.
pub struct CodeGenerator<R: SecureRandom> {
    rng: R,
}

impl<R: SecureRandom> CodeGenerator<R> {
    /// Creates a generator over `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Generates one code of the given type, e.g. `LTAB23CD45`.
    ///
    /// Fails with [`CryptoError::Generation`] if the random source keeps
    /// producing rejected bytes for `MAX_REFILLS` buffers.
    pub fn generate(&self, code_type: CodeType) -> CryptoResult<CanonicalCode> {
        let mut body = String::with_capacity(BODY_LEN);
        let mut buf = [0u8; 16];
        let mut refills = 0;

        while body.len() < BODY_LEN {
            if refills == MAX_REFILLS {
                return Err(CryptoError::Generation(format!(
                    "random source yielded {} of {BODY_LEN} usable bytes in {MAX_REFILLS} buffers",
                    body.len()
                )));
            }
            refills += 1;
            self.rng.fill_bytes(&mut buf)?;
            for &byte in &buf {
                if byte >= REJECTION_MAX {
                    continue;
                }
                body.push(CODE_ALPHABET[usize::from(byte) % CODE_ALPHABET.len()] as char);
                if body.len() == BODY_LEN {
                    break;
                }
            }
        }

        Ok(CanonicalCode::normalize(&format!(
            "{}{body}",
            code_type.prefix()
        )))
    }

    /// Generates `count` distinct codes, skipping any in `exclude`.
    ///
    /// Gives up after `count * 4` draws (at least 16). Each draw is itself
    /// bounded, see [`CodeGenerator::generate`].
    pub fn generate_batch(
        &self,
        code_type: CodeType,
        count: usize,
        exclude: &BTreeSet<CanonicalCode>,
    ) -> CryptoResult<Vec<CanonicalCode>> {
        let mut seen = BTreeSet::new();
        let mut codes = Vec::with_capacity(count);
        let max_draws = count.saturating_mul(4).max(16);

        for _ in 0..max_draws {
            if codes.len() == count {
                break;
            }
            let code = self.generate(code_type)?;
            if exclude.contains(&code) || !seen.insert(code.clone()) {
                continue;
            }
            codes.push(code);
        }

        if codes.len() < count {
            return Err(CryptoError::Generation(format!(
                "only {} of {count} distinct codes after {max_draws} draws",
                codes.len()
            )));
        }
        Ok(codes)
    }
}
