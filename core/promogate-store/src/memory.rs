use crate::error::{StoreError, StoreResult};
use crate::SnapshotStore;
use std::sync::{Mutex, PoisonError};

/// In-memory store.
///
/// Can be told to fail upcoming saves so callers can exercise their
/// persistence-failure paths.
#[derive(Debug)]
pub struct MemoryStore<T> {
    inner: Mutex<Inner<T>>,
}

#[derive(Debug)]
struct Inner<T> {
    value: Option<T>,
    failing_saves: usize,
    saves: usize,
}

impl<T> MemoryStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: None,
                failing_saves: 0,
                saves: 0,
            }),
        }
    }

    /// Creates a store already holding `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        let store = Self::new();
        store.lock().value = Some(value);
        store
    }

    /// Makes the next `count` saves fail with [`StoreError::Unavailable`].
    pub fn fail_next_saves(&self, count: usize) {
        self.lock().failing_saves = count;
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> SnapshotStore<T> for MemoryStore<T> {
    fn load(&self) -> StoreResult<Option<T>> {
        Ok(self.lock().value.clone())
    }

    fn save(&self, value: &T) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.failing_saves > 0 {
            inner.failing_saves -= 1;
            return Err(StoreError::Unavailable("injected save failure".to_string()));
        }
        inner.value = Some(value.clone());
        inner.saves += 1;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.lock().value = None;
        Ok(())
    }
}
