//! Boundary to the durable backup store.
//!
//! The backup store (keychain or similar) survives uninstall. The bridge
//! restores from it once at startup, writes to it after every redemption,
//! and answers whether a code was redeemed on the current install from the
//! last history it successfully persisted or restored.

use crate::error::{RedeemError, RedeemResult};
use promogate_crypto::strings_equal;
use promogate_store::SnapshotStore;
use promogate_types::{CanonicalCode, InstallId, LedgerSnapshot, RedemptionRecord};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Reads and writes the durable ledger backup.
pub struct PersistenceBackupBridge {
    store: Box<dyn SnapshotStore<LedgerSnapshot>>,
    install_id: InstallId,
    durable_history: Vec<RedemptionRecord>,
}

impl PersistenceBackupBridge {
    /// Creates a bridge for `install_id` over `store`.
    pub fn new(store: Box<dyn SnapshotStore<LedgerSnapshot>>, install_id: InstallId) -> Self {
        Self {
            store,
            install_id,
            durable_history: Vec::new(),
        }
    }

    /// The current install.
    #[must_use]
    pub fn install_id(&self) -> InstallId {
        self.install_id
    }

    /// Loads the backup, if one exists.
    ///
    /// A backup that cannot be read is treated as absent, with a warning:
    /// redemption keeps working from local state.
    pub fn restore_if_available(&mut self) -> Option<LedgerSnapshot> {
        match self.store.load() {
            Ok(Some(snapshot)) => {
                info!(
                    lifetime = snapshot.used_lifetime.len(),
                    time_limited = snapshot.used_time_limited.len(),
                    history = snapshot.history.len(),
                    "Restored redemption backup"
                );
                self.durable_history = snapshot.history.clone();
                Some(snapshot)
            }
            Ok(None) => {
                debug!("No redemption backup found");
                None
            }
            Err(e) => {
                warn!("Failed to read redemption backup: {}", e);
                None
            }
        }
    }

    /// Writes the ledger and history to the backup store.
    ///
    /// # Errors
    ///
    /// Returns [`RedeemError::PersistenceFailure`] if the store rejects the
    /// write.
    pub fn backup(
        &mut self,
        used_lifetime: &BTreeSet<CanonicalCode>,
        used_time_limited: &BTreeSet<CanonicalCode>,
        history: &[RedemptionRecord],
    ) -> RedeemResult<()> {
        let snapshot = LedgerSnapshot {
            used_lifetime: used_lifetime.clone(),
            used_time_limited: used_time_limited.clone(),
            history: history.to_vec(),
        };

        self.store
            .save(&snapshot)
            .map_err(|e| RedeemError::PersistenceFailure(e.to_string()))?;

        self.durable_history = snapshot.history;
        Ok(())
    }

    /// Returns true if the durable history holds `code` for this install.
    #[must_use]
    pub fn was_redeemed_on_this_install(&self, code: &CanonicalCode) -> bool {
        let mut found = false;
        for record in &self.durable_history {
            let same_code = strings_equal(record.code.as_str(), code.as_str());
            found |= same_code && record.install_id == self.install_id;
        }
        found
    }
}
