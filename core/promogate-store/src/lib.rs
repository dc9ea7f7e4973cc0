//! Snapshot persistence for Promogate.
//!
//! Redemption state is small and written rarely, so each store holds a
//! single serde document and replaces it wholesale on every save.
//!
//! # Stores
//!
//! - [`MemoryStore`]: process-local, for tests and dry runs
//! - [`JsonFileStore`]: a JSON file replaced atomically via rename; point it
//!   at install-local storage for app state, or at a location that survives
//!   reinstallation for the backup copy

mod error;
mod file;
mod memory;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// A durable home for one serializable document.
pub trait SnapshotStore<T>: Send + Sync {
    /// Loads the stored document, or `None` if nothing was ever saved.
    fn load(&self) -> StoreResult<Option<T>>;

    /// Replaces the stored document. Returns only once the write is durable.
    fn save(&self, value: &T) -> StoreResult<()>;

    /// Removes the stored document.
    fn clear(&self) -> StoreResult<()>;
}

impl<T, S> SnapshotStore<T> for std::sync::Arc<S>
where
    S: SnapshotStore<T> + ?Sized,
{
    fn load(&self) -> StoreResult<Option<T>> {
        (**self).load()
    }

    fn save(&self, value: &T) -> StoreResult<()> {
        (**self).save(value)
    }

    fn clear(&self) -> StoreResult<()> {
        (**self).clear()
    }
}
