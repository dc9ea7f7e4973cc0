//! Tamper-evident digest over granted entitlement facts.
//!
//! The token is a plain SHA-256 over a canonical encoding of the facts. It
//! carries no secret key, so anyone who knows the encoding can forge one. It
//! catches hand-edited preference files, nothing more.

use crate::matcher::strings_equal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const TOKEN_DOMAIN: &str = "promogate.access.v1";

/// The entitlement state a redemption produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementFacts {
    /// Lifetime access was granted.
    pub has_lifetime: bool,
    /// Premium access is active.
    pub has_premium: bool,
    /// Subscription expiry, `None` for lifetime grants.
    pub expires_at: Option<DateTime<Utc>>,
}

impl EntitlementFacts {
    /// Facts for a permanent grant.
    #[must_use]
    pub fn lifetime() -> Self {
        Self {
            has_lifetime: true,
            has_premium: true,
            expires_at: None,
        }
    }

    /// Facts for a subscription ending at `expires_at`.
    #[must_use]
    pub fn subscription(expires_at: DateTime<Utc>) -> Self {
        Self {
            has_lifetime: false,
            has_premium: true,
            expires_at: Some(expires_at),
        }
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let expiry = self
            .expires_at
            .map_or_else(|| "-".to_string(), |t| t.timestamp().to_string());
        format!(
            "{TOKEN_DOMAIN}|{}|{}|{expiry}",
            u8::from(self.has_lifetime),
            u8::from(self.has_premium)
        )
        .into_bytes()
    }
}

/// Hex-encoded digest binding a set of [`EntitlementFacts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessIntegrityToken(String);

impl AccessIntegrityToken {
    /// Computes the token for `facts`.
    #[must_use]
    pub fn compute(facts: &EntitlementFacts) -> Self {
        Self(hex::encode(Sha256::digest(facts.canonical_bytes())))
    }

    /// Returns true if this token was computed from `facts`.
    #[must_use]
    pub fn verify(&self, facts: &EntitlementFacts) -> bool {
        strings_equal(&self.0, &Self::compute(facts).0)
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
