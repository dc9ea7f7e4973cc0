//! Error types for validation and redemption.

use promogate_crypto::CryptoError;
use promogate_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Expected, user-facing reasons a code was not accepted.
///
/// These are ordinary outcomes, not faults. The display text is suitable
/// for showing to the user as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Nothing left after normalization.
    #[error("please enter a code")]
    EmptyInput,

    /// The code's digest is not in the registry.
    #[error("invalid code")]
    UnrecognizedCode,

    /// The code is valid but already in the used-code ledger.
    #[error("this code has already been redeemed")]
    AlreadyRedeemed,

    /// Too many recent attempts; a lockout is active.
    #[error("too many attempts, please try again later")]
    RateLimited,

    /// The install-scoped history already holds this code.
    #[error("this code was already redeemed on this device")]
    AlreadyRedeemedOnThisInstall,
}

/// Redemption errors.
#[derive(Debug, Error)]
pub enum RedeemError {
    /// The code was rejected.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The used-code state could not be made durable. No entitlement was
    /// granted; the caller should retry.
    #[error("could not save redemption: {0}")]
    PersistenceFailure(String),

    /// The clock produced a time outside the representable range.
    #[error("clock out of range")]
    ClockOutOfRange,

    /// Invalid configuration or registry data.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage error outside the redemption commit path.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl RedeemError {
    /// Returns the rejection reason, if this is an expected outcome.
    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns true for expected outcomes that are shown to the user.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns true if trying the same redemption again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }
}

/// Result type for redemption operations.
pub type RedeemResult<T> = Result<T, RedeemError>;
