//! Redemption configuration, read from `promogate.toml`.

use crate::error::{RedeemError, RedeemResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Upper bound for the attempt window and lockout (one year).
pub const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// Tunables for validation and redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionConfig {
    /// Attempts within the window that trigger a lockout.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Length of the trailing attempt window, in seconds.
    #[serde(default = "default_window_secs")]
    pub attempt_window_secs: u64,
    /// How long a lockout lasts, in seconds.
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,
    /// Maximum redemption records kept; oldest are evicted first.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Accept unprefixed codes from the legacy registry set.
    #[serde(default)]
    pub legacy_codes: bool,
    /// Extra backup attempts before a redemption is abandoned.
    #[serde(default = "default_backup_retries")]
    pub backup_retries: u32,
}

fn default_max_attempts() -> usize {
    10
}

fn default_window_secs() -> u64 {
    3600
}

fn default_lockout_secs() -> u64 {
    3600
}

fn default_history_cap() -> usize {
    100
}

fn default_backup_retries() -> u32 {
    1
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_window_secs: default_window_secs(),
            lockout_secs: default_lockout_secs(),
            history_cap: default_history_cap(),
            legacy_codes: false,
            backup_retries: default_backup_retries(),
        }
    }
}

impl RedemptionConfig {
    /// Loads configuration from `path`.
    ///
    /// A missing or unparsable file falls back to defaults with a warning,
    /// so a bad config never takes redemption offline.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No redemption config at {:?}, using defaults", path);
            return Self::default();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| RedeemError::Config(e.to_string()))
            .and_then(|contents| Self::from_toml_str(&contents));

        match parsed {
            Ok(config) => {
                info!("Loaded redemption config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Failed to load redemption config {:?}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> RedeemResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| RedeemError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would disable a safeguard.
    pub fn validate(&self) -> RedeemResult<()> {
        if self.max_attempts == 0 {
            return Err(RedeemError::Config("max_attempts must be at least 1".into()));
        }
        if self.attempt_window_secs == 0 {
            return Err(RedeemError::Config(
                "attempt_window_secs must be at least 1".into(),
            ));
        }
        if self.lockout_secs == 0 {
            return Err(RedeemError::Config("lockout_secs must be at least 1".into()));
        }
        if self.attempt_window_secs > MAX_PERIOD_SECS || self.lockout_secs > MAX_PERIOD_SECS {
            return Err(RedeemError::Config(format!(
                "attempt_window_secs and lockout_secs must not exceed {MAX_PERIOD_SECS}"
            )));
        }
        if self.history_cap == 0 {
            return Err(RedeemError::Config("history_cap must be at least 1".into()));
        }
        Ok(())
    }

    /// The attempt window as a duration.
    #[must_use]
    pub fn attempt_window(&self) -> Duration {
        Duration::seconds(self.attempt_window_secs.min(MAX_PERIOD_SECS) as i64)
    }

    /// The lockout length as a duration.
    #[must_use]
    pub fn lockout(&self) -> Duration {
        Duration::seconds(self.lockout_secs.min(MAX_PERIOD_SECS) as i64)
    }
}
