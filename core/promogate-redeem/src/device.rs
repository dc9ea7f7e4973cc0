//! Install identity.
//!
//! Each installation gets a random ID stored in install-local data. Deleting
//! the app deletes the ID, so a reinstall is a new install even when the
//! used-code ledger comes back from backup.

use crate::error::RedeemResult;
use promogate_store::StoreError;
use promogate_types::InstallId;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Supplies the current install's identifier.
pub trait InstallIdProvider: Send + Sync {
    /// Returns the install ID, creating it on first use.
    fn install_id(&self) -> RedeemResult<InstallId>;
}

/// A fixed ID, for tests and embedding hosts that manage their own.
#[derive(Debug, Clone, Copy)]
pub struct FixedInstallId(pub InstallId);

impl InstallIdProvider for FixedInstallId {
    fn install_id(&self) -> RedeemResult<InstallId> {
        Ok(self.0)
    }
}

/// An ID persisted as a text file in the app's local data directory.
#[derive(Debug)]
pub struct FileInstallId {
    path: PathBuf,
    cached: OnceLock<InstallId>,
}

impl FileInstallId {
    /// Uses `<local data dir>/promogate/install-id`.
    ///
    /// Falls back to the working directory when the platform has no local
    /// data directory.
    #[must_use]
    pub fn default_location() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(base.join("promogate").join("install-id"))
    }

    /// Uses an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_or_create(&self) -> Result<InstallId, StoreError> {
        if self.path.exists() {
            let contents = fs::read_to_string(&self.path)?;
            match InstallId::parse(&contents) {
                Ok(id) => return Ok(id),
                Err(e) => warn!(
                    "Install ID file {:?} is unreadable ({}), issuing a new one",
                    self.path, e
                ),
            }
        }

        let id = InstallId::new();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, id.to_string())?;
        info!("Issued install ID {}", id);
        Ok(id)
    }
}

impl InstallIdProvider for FileInstallId {
    fn install_id(&self) -> RedeemResult<InstallId> {
        if let Some(id) = self.cached.get() {
            return Ok(*id);
        }
        let id = self.load_or_create()?;
        Ok(*self.cached.get_or_init(|| id))
    }
}
