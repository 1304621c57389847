//! Write serialization for save batches.

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Serializes save batches against a shared store scope.
///
/// Cloning produces handles onto the same underlying lock, so every engine
/// sharing a store scope contends on one lock. Only the save path takes the
/// lock, on the write side, which keeps at most one batch flushing at a time.
/// Loads do not go through the lock; a load racing a save can observe the
/// store mid-batch. Callers that need a quiescent store can hold the read
/// side themselves to keep save batches out.
#[derive(Clone, Debug, Default)]
pub struct StoreLock {
    inner: Arc<RwLock<()>>,
}

impl StoreLock {
    /// Create a fresh lock scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no save batch is in flight, then hold the scope exclusively.
    ///
    /// The guard is owned, so it can cross await points and is released when
    /// dropped.
    pub async fn acquire_write(&self) -> OwnedRwLockWriteGuard<()> {
        self.inner.clone().write_owned().await
    }

    /// Hold the scope shared with other readers.
    pub async fn acquire_read(&self) -> OwnedRwLockReadGuard<()> {
        self.inner.clone().read_owned().await
    }
}
