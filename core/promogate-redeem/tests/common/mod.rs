//! Shared test helpers for redemption tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use promogate_redeem::{
    Collaborators, FixedInstallId, HashRegistry, LocalState, MemoryEntitlements,
    RedemptionConfig, RedemptionService,
};
use promogate_store::MemoryStore;
use promogate_types::{Clock, InstallId, LedgerSnapshot, ManualClock};
use std::sync::Arc;

pub const LIFETIME_CODES: [&str; 3] = ["LTAB12CD34", "LTQRST5678", "LTWXYZ2345"];
pub const MONTHLY_CODES: [&str; 3] = ["MOAB12CD34", "MOHJKM6789", "MONPQR3456"];
pub const LEGACY_CODES: [&str; 1] = ["WELCOME2020"];

/// 2025-03-10 12:00:00 UTC.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub fn registry() -> HashRegistry {
    HashRegistry::from_codes(&LIFETIME_CODES, &MONTHLY_CODES, &LEGACY_CODES)
}

/// A small limiter so lockout tests stay short.
pub fn tight_config() -> RedemptionConfig {
    RedemptionConfig {
        max_attempts: 3,
        attempt_window_secs: 60,
        lockout_secs: 300,
        ..RedemptionConfig::default()
    }
}

/// A service wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub service: RedemptionService,
    pub clock: Arc<ManualClock>,
    pub entitlements: Arc<MemoryEntitlements>,
    pub local: Arc<MemoryStore<LocalState>>,
    pub backup: Arc<MemoryStore<LedgerSnapshot>>,
    pub install_id: InstallId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RedemptionConfig::default())
    }

    pub fn with_config(config: RedemptionConfig) -> Self {
        Self::build(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            InstallId::new(),
            start(),
        )
    }

    pub fn build(
        config: RedemptionConfig,
        local: Arc<MemoryStore<LocalState>>,
        backup: Arc<MemoryStore<LedgerSnapshot>>,
        install_id: InstallId,
        at: DateTime<Utc>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(at));
        let entitlements = Arc::new(MemoryEntitlements::new());
        let collaborators = Collaborators {
            local_store: Box::new(Arc::clone(&local)),
            backup_store: Box::new(Arc::clone(&backup)),
            install_ids: Box::new(FixedInstallId(install_id)),
            entitlements: entitlements.clone(),
            clock: clock.clone(),
        };
        let service = RedemptionService::new(registry(), config, collaborators).unwrap();
        Self {
            service,
            clock,
            entitlements,
            local,
            backup,
            install_id,
        }
    }

    /// The same install after a process restart.
    pub fn restart(&self) -> Self {
        Self::build(
            self.service.config().clone(),
            Arc::clone(&self.local),
            Arc::clone(&self.backup),
            self.install_id,
            self.clock.now(),
        )
    }

    /// A fresh install on a device whose backup survived.
    pub fn reinstall(&self) -> Self {
        Self::build(
            self.service.config().clone(),
            Arc::new(MemoryStore::new()),
            Arc::clone(&self.backup),
            InstallId::new(),
            self.clock.now(),
        )
    }
}
