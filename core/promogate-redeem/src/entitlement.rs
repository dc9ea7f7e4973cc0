//! The entitlement collaborator.
//!
//! Promogate decides *whether* to grant; the host app's entitlement layer
//! owns *what* premium access means. [`MemoryEntitlements`] is a reference
//! implementation for tests and dry runs.

use chrono::{DateTime, Utc};
use promogate_crypto::{AccessIntegrityToken, EntitlementFacts};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Grants premium access. Calls are synchronous and infallible from the
/// redemption path's point of view.
pub trait EntitlementManager: Send + Sync {
    /// Grants permanent premium access.
    fn grant_lifetime(&self);

    /// Grants premium access through `expires_at`.
    fn grant_subscription(&self, expires_at: DateTime<Utc>);

    /// Stores the token binding the facts just granted.
    fn store_integrity_token(&self, facts: &EntitlementFacts, token: &AccessIntegrityToken);
}

#[derive(Debug, Default)]
struct State {
    has_lifetime: bool,
    expires_at: Option<DateTime<Utc>>,
    stored: Option<(EntitlementFacts, AccessIntegrityToken)>,
    grants: usize,
}

/// In-memory entitlements.
#[derive(Debug, Default)]
pub struct MemoryEntitlements {
    state: Mutex<State>,
}

impl MemoryEntitlements {
    /// Creates an instance with nothing granted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if lifetime access was granted.
    #[must_use]
    pub fn has_lifetime(&self) -> bool {
        self.lock().has_lifetime
    }

    /// Returns true if premium access is active at `now`.
    #[must_use]
    pub fn has_premium(&self, now: DateTime<Utc>) -> bool {
        let state = self.lock();
        state.has_lifetime || state.expires_at.is_some_and(|exp| now < exp)
    }

    /// Subscription expiry, if any.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.lock().expires_at
    }

    /// Number of grants received.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.lock().grants
    }

    /// The last stored token.
    #[must_use]
    pub fn integrity_token(&self) -> Option<AccessIntegrityToken> {
        self.lock().stored.as_ref().map(|(_, t)| t.clone())
    }

    /// Returns true if the current state matches the last stored token.
    ///
    /// False when nothing was ever stored or when the state was changed
    /// without going through a grant.
    #[must_use]
    pub fn verify_integrity(&self) -> bool {
        let state = self.lock();
        let Some((granted, token)) = &state.stored else {
            return false;
        };
        let current = if granted.has_lifetime {
            EntitlementFacts {
                has_lifetime: state.has_lifetime,
                has_premium: state.has_lifetime,
                expires_at: None,
            }
        } else {
            EntitlementFacts {
                has_lifetime: false,
                has_premium: state.expires_at.is_some(),
                expires_at: state.expires_at,
            }
        };
        token.verify(&current)
    }

    /// Overwrites the expiry without a grant, the way a hand-edited
    /// preferences file would.
    pub fn tamper_expiry(&self, expires_at: DateTime<Utc>) {
        self.lock().expires_at = Some(expires_at);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EntitlementManager for MemoryEntitlements {
    fn grant_lifetime(&self) {
        let mut state = self.lock();
        state.has_lifetime = true;
        state.grants += 1;
    }

    fn grant_subscription(&self, expires_at: DateTime<Utc>) {
        let mut state = self.lock();
        state.expires_at = Some(expires_at);
        state.grants += 1;
    }

    fn store_integrity_token(&self, facts: &EntitlementFacts, token: &AccessIntegrityToken) {
        self.lock().stored = Some((*facts, token.clone()));
    }
}
