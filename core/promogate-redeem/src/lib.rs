//! Promo code validation and redemption.
//!
//! This crate handles:
//! - Validating user-entered codes against a registry of SHA-256 digests
//! - Rate limiting failed attempts with a sliding window and lockout
//! - Atomically marking codes used and granting lifetime or monthly access
//! - Backing the used-code ledger up to a store that survives reinstalls
//!
//! # Design Principles
//!
//! - **No plaintext at rest**: the app ships digests, never codes
//! - **Constant-time lookups**: every membership scan visits every element
//! - **Durable before granted**: access is granted only after the ledger
//!   backup succeeds
//! - **One critical section**: validation, marking and granting never
//!   interleave between threads
//!
//! # Code Format
//!
//! Canonical codes are a two-letter type prefix followed by the body:
//! `LT` for lifetime, `MO` for one calendar month. Input is normalized by
//! dropping whitespace and hyphens and uppercasing, so `lt-ab12-cd34` and
//! `LTAB12CD34` are the same code.

mod bridge;
mod config;
mod coordinator;
mod device;
mod entitlement;
mod error;
mod events;
mod rate_limit;
mod registry;
mod validator;

pub use bridge::PersistenceBackupBridge;
pub use config::{RedemptionConfig, MAX_PERIOD_SECS};
pub use coordinator::{subscription_expiry, Collaborators, Grant, LocalState, RedemptionService};
pub use device::{FileInstallId, FixedInstallId, InstallIdProvider};
pub use entitlement::{EntitlementManager, MemoryEntitlements};
pub use error::{RedeemError, RedeemResult, Rejection};
pub use events::RedemptionEvent;
pub use rate_limit::{RateLimitSnapshot, RateLimiter};
pub use registry::{HashRegistry, RegistryFile};
pub use validator::{CodeValidator, ValidationResult};
