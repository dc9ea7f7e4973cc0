//! Redemption records and the ledger snapshot.

use crate::{CanonicalCode, CodeType, InstallId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    /// Canonical code that was redeemed.
    pub code: CanonicalCode,
    /// Type the code was redeemed as.
    pub code_type: CodeType,
    /// When the redemption committed.
    pub redeemed_at: DateTime<Utc>,
    /// Install the redemption happened on.
    pub install_id: InstallId,
}

/// The persisted shape of the used-code ledger and redemption history.
///
/// This is what gets written to the durable backup store after every
/// redemption and read back on a fresh install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Used lifetime codes.
    #[serde(default)]
    pub used_lifetime: BTreeSet<CanonicalCode>,
    /// Used time-limited codes.
    #[serde(default)]
    pub used_time_limited: BTreeSet<CanonicalCode>,
    /// Redemption history, oldest first.
    #[serde(default)]
    pub history: Vec<RedemptionRecord>,
}

impl LedgerSnapshot {
    /// Returns the used set for a code type.
    #[must_use]
    pub fn used(&self, code_type: CodeType) -> &BTreeSet<CanonicalCode> {
        match code_type {
            CodeType::Lifetime => &self.used_lifetime,
            CodeType::TimeLimited => &self.used_time_limited,
        }
    }

    /// Returns the mutable used set for a code type.
    pub fn used_mut(&mut self, code_type: CodeType) -> &mut BTreeSet<CanonicalCode> {
        match code_type {
            CodeType::Lifetime => &mut self.used_lifetime,
            CodeType::TimeLimited => &mut self.used_time_limited,
        }
    }

    /// Returns true if nothing has ever been redeemed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_lifetime.is_empty() && self.used_time_limited.is_empty() && self.history.is_empty()
    }

    /// Merges another snapshot into this one.
    ///
    /// Used sets are unioned, so a merge can never un-use a code. History
    /// entries are deduplicated and kept in chronological order; the caller
    /// applies its own cap afterwards.
    pub fn merge(&mut self, other: &LedgerSnapshot) {
        self.used_lifetime.extend(other.used_lifetime.iter().cloned());
        self.used_time_limited
            .extend(other.used_time_limited.iter().cloned());

        for record in &other.history {
            if !self.history.contains(record) {
                self.history.push(record.clone());
            }
        }
        self.history.sort_by_key(|r| r.redeemed_at);
    }

    /// Drops the oldest history entries until at most `cap` remain.
    pub fn trim_history(&mut self, cap: usize) {
        if self.history.len() > cap {
            let excess = self.history.len() - cap;
            self.history.drain(..excess);
        }
    }
}
