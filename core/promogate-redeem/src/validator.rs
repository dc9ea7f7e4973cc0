//! Code validation.
//!
//! Normalizes input, classifies it by prefix, and checks it against the
//! registry and the used-code ledger using constant-time scans. Every
//! failure after the lockout check records exactly one attempt; success
//! records none.

use crate::error::Rejection;
use crate::rate_limit::RateLimiter;
use crate::registry::HashRegistry;
use chrono::{DateTime, Utc};
use promogate_crypto::{set_contains, CodeDigest};
use promogate_types::{CanonicalCode, CodeType, LedgerSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of validating a raw code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ValidationResult {
    /// Issued and not yet used.
    Valid {
        code: CanonicalCode,
        code_type: CodeType,
    },
    /// Not redeemable: empty, unknown, or rate limited.
    Invalid { reason: Rejection },
    /// Issued but already redeemed.
    AlreadyUsed { reason: Rejection },
}

impl ValidationResult {
    /// Returns true for [`ValidationResult::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns the rejection reason for non-valid results.
    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason } | Self::AlreadyUsed { reason } => Some(*reason),
        }
    }

    /// Returns the message to show the user, or `None` when valid.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.rejection().map(|r| r.to_string())
    }
}

/// Checks codes against a registry.
#[derive(Debug, Clone)]
pub struct CodeValidator {
    registry: HashRegistry,
    legacy_codes: bool,
}

impl CodeValidator {
    /// Creates a validator. `legacy_codes` enables unprefixed codes.
    #[must_use]
    pub fn new(registry: HashRegistry, legacy_codes: bool) -> Self {
        Self {
            registry,
            legacy_codes,
        }
    }

    /// Returns the registry in use.
    #[must_use]
    pub fn registry(&self) -> &HashRegistry {
        &self.registry
    }

    /// Validates `raw` against the registry and `ledger`.
    pub fn validate(
        &self,
        raw: &str,
        ledger: &LedgerSnapshot,
        limiter: &mut RateLimiter,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        // Nothing below may run while locked out.
        if limiter.is_locked_out(now) {
            return ValidationResult::Invalid {
                reason: Rejection::RateLimited,
            };
        }

        let code = CanonicalCode::normalize(raw);
        if code.is_empty() {
            limiter.record_attempt(now);
            return ValidationResult::Invalid {
                reason: Rejection::EmptyInput,
            };
        }

        let Some((code_type, registered)) = self.lookup(&code) else {
            limiter.record_attempt(now);
            debug!("Rejected unprefixed code with legacy support off");
            return ValidationResult::Invalid {
                reason: Rejection::UnrecognizedCode,
            };
        };

        if !registered {
            limiter.record_attempt(now);
            debug!(code_type = %code_type, "Rejected unrecognized code");
            return ValidationResult::Invalid {
                reason: Rejection::UnrecognizedCode,
            };
        }

        if set_contains(ledger.used(code_type), code.as_bytes()) {
            limiter.record_attempt(now);
            debug!(code_type = %code_type, "Rejected used code");
            return ValidationResult::AlreadyUsed {
                reason: Rejection::AlreadyRedeemed,
            };
        }

        ValidationResult::Valid { code, code_type }
    }

    /// Hashes `code` once and scans every set in full, then picks the
    /// result for the code's class. Prefixed and legacy codes therefore do
    /// identical work.
    ///
    /// Returns `None` for an unprefixed code when legacy support is off.
    fn lookup(&self, code: &CanonicalCode) -> Option<(CodeType, bool)> {
        let digest = CodeDigest::of(code);
        let needle = digest.as_bytes();

        let in_lifetime = set_contains(self.registry.digests(CodeType::Lifetime), needle);
        let in_time_limited = set_contains(self.registry.digests(CodeType::TimeLimited), needle);
        let in_legacy = set_contains(self.registry.legacy_digests(), needle);

        match CodeType::classify(code) {
            Some(CodeType::Lifetime) => Some((CodeType::Lifetime, in_lifetime)),
            Some(CodeType::TimeLimited) => Some((CodeType::TimeLimited, in_time_limited)),
            // Legacy codes predate time-limited codes and redeem as lifetime.
            None if self.legacy_codes => Some((CodeType::Lifetime, in_legacy)),
            None => None,
        }
    }
}
