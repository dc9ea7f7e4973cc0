//! Core type definitions for Promogate.
//!
//! This crate defines the plain data shared by every other crate:
//! - Code types and their prefixes
//! - Canonical (normalized) promo codes
//! - Install identifiers
//! - Redemption records and the ledger snapshot that gets backed up
//! - A clock abstraction so time-dependent logic stays testable
//!
//! Nothing in here holds secrets or performs hashing; digests live in
//! `promogate-crypto`.

mod clock;
mod code;
mod ids;
mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use code::{CanonicalCode, CodeType, CODE_SEPARATOR};
pub use ids::InstallId;
pub use record::{LedgerSnapshot, RedemptionRecord};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown code type: {0}")]
    UnknownCodeType(String),
}
