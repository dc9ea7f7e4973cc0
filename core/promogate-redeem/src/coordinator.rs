//! Atomic redemption.
//!
//! [`RedemptionService`] is the only entry point that grants value. All
//! reads and writes of the ledger, the attempt log and the history happen
//! under one mutex, so concurrent redeem calls for the same code produce
//! exactly one grant.
//!
//! Commit order: mark used, append history, back up (retrying once), then
//! grant. A failed backup rolls the in-memory state back and grants
//! nothing, so an entitlement never exists for a code that is not durably
//! marked used.

use crate::bridge::PersistenceBackupBridge;
use crate::config::RedemptionConfig;
use crate::device::{FixedInstallId, InstallIdProvider};
use crate::entitlement::EntitlementManager;
use crate::error::{RedeemError, RedeemResult, Rejection};
use crate::events::RedemptionEvent;
use crate::rate_limit::{RateLimitSnapshot, RateLimiter};
use crate::registry::HashRegistry;
use crate::validator::{CodeValidator, ValidationResult};
use chrono::{DateTime, Duration, Months, Utc};
use promogate_crypto::{set_contains, AccessIntegrityToken, EntitlementFacts};
use promogate_store::{MemoryStore, SnapshotStore};
use promogate_types::{
    CanonicalCode, Clock, CodeType, InstallId, LedgerSnapshot, RedemptionRecord, SystemClock,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Install-local state, lost on uninstall.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub ledger: LedgerSnapshot,
    #[serde(default)]
    pub rate_limit: RateLimitSnapshot,
}

/// External services the redemption service depends on.
pub struct Collaborators {
    /// Install-local state.
    pub local_store: Box<dyn SnapshotStore<LocalState>>,
    /// Durable backup that survives reinstallation.
    pub backup_store: Box<dyn SnapshotStore<LedgerSnapshot>>,
    /// Source of the install ID.
    pub install_ids: Box<dyn InstallIdProvider>,
    /// Receives grants.
    pub entitlements: Arc<dyn EntitlementManager>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// In-memory stores, a fresh install ID and the system clock.
    #[must_use]
    pub fn in_memory(entitlements: Arc<dyn EntitlementManager>) -> Self {
        Self {
            local_store: Box::new(MemoryStore::new()),
            backup_store: Box::new(MemoryStore::new()),
            install_ids: Box::new(FixedInstallId(InstallId::new())),
            entitlements,
            clock: Arc::new(SystemClock),
        }
    }
}

/// A committed redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// The redeemed code.
    pub code: CanonicalCode,
    /// What it granted.
    pub code_type: CodeType,
    /// Commit time.
    pub redeemed_at: DateTime<Utc>,
    /// Subscription expiry; `None` for lifetime.
    pub expires_at: Option<DateTime<Utc>>,
    /// Token handed to the entitlement layer.
    pub token: AccessIntegrityToken,
}

struct ServiceState {
    ledger: LedgerSnapshot,
    limiter: RateLimiter,
    bridge: PersistenceBackupBridge,
}

/// Validates and redeems promo codes.
///
/// Construct one per process and share it via `Arc`.
pub struct RedemptionService {
    config: RedemptionConfig,
    validator: CodeValidator,
    state: Mutex<ServiceState>,
    local_store: Box<dyn SnapshotStore<LocalState>>,
    entitlements: Arc<dyn EntitlementManager>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<RedemptionEvent>,
}

impl RedemptionService {
    /// Builds the service and rehydrates state.
    ///
    /// Local state and the durable backup are merged (union of used codes
    /// and history). If the merge added anything the backup lacked, the
    /// backup is refreshed.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when the install ID cannot be
    /// obtained.
    pub fn new(
        registry: HashRegistry,
        config: RedemptionConfig,
        collaborators: Collaborators,
    ) -> RedeemResult<Self> {
        config.validate()?;
        let install_id = collaborators.install_ids.install_id()?;

        let local = match collaborators.local_store.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read local redemption state: {}", e);
                LocalState::default()
            }
        };

        let mut bridge = PersistenceBackupBridge::new(collaborators.backup_store, install_id);
        let restored = bridge.restore_if_available();

        let mut ledger = local.ledger.clone();
        if let Some(backup) = &restored {
            ledger.merge(backup);
        }
        ledger.trim_history(config.history_cap);

        if !ledger.is_empty() && restored.as_ref() != Some(&ledger) {
            if let Err(e) = bridge.backup(
                &ledger.used_lifetime,
                &ledger.used_time_limited,
                &ledger.history,
            ) {
                warn!("Failed to refresh redemption backup at startup: {}", e);
            }
        }

        let local_stale = ledger != local.ledger;
        let limiter = RateLimiter::restore(&config, &local.rate_limit);
        let validator = CodeValidator::new(registry, config.legacy_codes);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let service = Self {
            config,
            validator,
            state: Mutex::new(ServiceState {
                ledger,
                limiter,
                bridge,
            }),
            local_store: collaborators.local_store,
            entitlements: collaborators.entitlements,
            clock: collaborators.clock,
            events,
        };

        if local_stale {
            service.persist_local(&service.lock_state());
        }

        info!(install_id = %install_id, "Redemption service ready");
        Ok(service)
    }

    /// Validates a code without redeeming it.
    pub fn validate(&self, raw: &str) -> ValidationResult {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let now = self.clock.now();
        let was_locked = state.limiter.remaining_lockout(now).is_some();

        let result = self
            .validator
            .validate(raw, &state.ledger, &mut state.limiter, now);
        if let Some(reason) = result.rejection() {
            self.after_rejection(state, reason, was_locked);
        }
        result
    }

    /// Redeems a code and grants its entitlement.
    ///
    /// # Errors
    ///
    /// [`RedeemError::Rejected`] for expected outcomes,
    /// [`RedeemError::PersistenceFailure`] when the redemption could not be
    /// made durable (nothing was granted; retry).
    pub fn redeem(&self, raw: &str) -> RedeemResult<Grant> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let now = self.clock.now();
        let was_locked = state.limiter.remaining_lockout(now).is_some();

        let (code, code_type) =
            match self
                .validator
                .validate(raw, &state.ledger, &mut state.limiter, now)
            {
                ValidationResult::Valid { code, code_type } => (code, code_type),
                ValidationResult::Invalid { reason } | ValidationResult::AlreadyUsed { reason } => {
                    self.after_rejection(state, reason, was_locked);
                    return Err(self.reject(now, reason));
                }
            };

        if state.bridge.was_redeemed_on_this_install(&code) {
            return Err(self.reject(now, Rejection::AlreadyRedeemedOnThisInstall));
        }

        // The commit below must only follow a membership check made here.
        if set_contains(state.ledger.used(code_type), code.as_bytes()) {
            return Err(self.reject(now, Rejection::AlreadyRedeemed));
        }

        let expires_at = if code_type.is_permanent() {
            None
        } else {
            Some(subscription_expiry(now)?)
        };

        let rollback = state.ledger.clone();
        state.ledger.used_mut(code_type).insert(code.clone());
        state.ledger.history.push(RedemptionRecord {
            code: code.clone(),
            code_type,
            redeemed_at: now,
            install_id: state.bridge.install_id(),
        });
        state.ledger.trim_history(self.config.history_cap);

        if let Err(e) = self.backup_with_retry(state) {
            state.ledger = rollback;
            warn!(code_type = %code_type, "Redemption abandoned, backup failed: {}", e);
            self.emit(RedemptionEvent::PersistenceFailed { code_type, at: now });
            return Err(e);
        }
        self.persist_local(state);

        let facts = match expires_at {
            None => {
                self.entitlements.grant_lifetime();
                EntitlementFacts::lifetime()
            }
            Some(expiry) => {
                self.entitlements.grant_subscription(expiry);
                EntitlementFacts::subscription(expiry)
            }
        };
        let token = AccessIntegrityToken::compute(&facts);
        self.entitlements.store_integrity_token(&facts, &token);

        info!(code = %code.redacted(), code_type = %code_type, "Redeemed promo code");
        self.emit(RedemptionEvent::Redeemed {
            code_type,
            expires_at,
            at: now,
        });

        Ok(Grant {
            code,
            code_type,
            redeemed_at: now,
            expires_at,
            token,
        })
    }

    /// Writes the current ledger to the backup store, e.g. when the app
    /// returns to the foreground.
    pub fn backup_now(&self) -> RedeemResult<()> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        state.bridge.backup(
            &state.ledger.used_lifetime,
            &state.ledger.used_time_limited,
            &state.ledger.history,
        )
    }

    /// Returns true while validation is locked out.
    pub fn is_locked_out(&self) -> bool {
        let now = self.clock.now();
        self.lock_state().limiter.is_locked_out(now)
    }

    /// Time left on an active lockout.
    pub fn lockout_remaining(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.lock_state().limiter.remaining_lockout(now)
    }

    /// Number of used codes of `code_type`.
    pub fn used_count(&self, code_type: CodeType) -> usize {
        self.lock_state().ledger.used(code_type).len()
    }

    /// Redemption history, oldest first.
    pub fn history(&self) -> Vec<RedemptionRecord> {
        self.lock_state().ledger.history.clone()
    }

    /// The current install.
    pub fn install_id(&self) -> InstallId {
        self.lock_state().bridge.install_id()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RedemptionConfig {
        &self.config
    }

    /// Subscribes to redemption events.
    pub fn subscribe(&self) -> broadcast::Receiver<RedemptionEvent> {
        self.events.subscribe()
    }

    /// Clears the ledger, history and limiter, locally and in the backup.
    ///
    /// Test and support tooling only; this is the one operation that can
    /// shrink the ledger.
    pub fn reset_for_testing(&self) -> RedeemResult<()> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        state.ledger = LedgerSnapshot::default();
        state.limiter.reset();
        state.bridge.backup(
            &state.ledger.used_lifetime,
            &state.ledger.used_time_limited,
            &state.ledger.history,
        )?;
        self.local_store.clear()?;
        warn!("Redemption state reset");
        Ok(())
    }

    fn backup_with_retry(&self, state: &mut ServiceState) -> RedeemResult<()> {
        let attempts = self.config.backup_retries.saturating_add(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match state.bridge.backup(
                &state.ledger.used_lifetime,
                &state.ledger.used_time_limited,
                &state.ledger.history,
            ) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, "Redemption backup attempt failed: {}", e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| RedeemError::PersistenceFailure("backup not attempted".into())))
    }

    fn after_rejection(
        &self,
        state: &ServiceState,
        reason: Rejection,
        was_locked: bool,
    ) {
        if reason == Rejection::RateLimited {
            return;
        }
        self.persist_local(state);

        if !was_locked {
            if let Some(until) = state.limiter.locked_until() {
                warn!(until = %until, "Promo code entry locked out");
                self.emit(RedemptionEvent::LockedOut { until });
            }
        }
    }

    fn reject(&self, now: DateTime<Utc>, reason: Rejection) -> RedeemError {
        debug!(reason = ?reason, "Redemption refused");
        self.emit(RedemptionEvent::Rejected { reason, at: now });
        reason.into()
    }

    fn persist_local(&self, state: &ServiceState) {
        let local = LocalState {
            ledger: state.ledger.clone(),
            rate_limit: state.limiter.snapshot(),
        };
        if let Err(e) = self.local_store.save(&local) {
            warn!("Failed to save local redemption state: {}", e);
        }
    }

    fn emit(&self, event: RedemptionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One calendar month after `from`, same time of day.
///
/// Days past the end of the next month clamp to its last day, so
/// January 31 becomes February 28 (or 29 in a leap year).
pub fn subscription_expiry(from: DateTime<Utc>) -> RedeemResult<DateTime<Utc>> {
    from.checked_add_months(Months::new(1))
        .ok_or(RedeemError::ClockOutOfRange)
}
