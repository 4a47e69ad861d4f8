use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::snapshot::OracleSnapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal store error: {0}")]
    Internal(String),
}

/// Port for durable snapshot storage. No network access.
///
/// The save/load contract: `save` is atomic (a reader never observes a
/// partial snapshot), and `load` returns `Ok(None)` both when no snapshot
/// exists and when the stored one fails its self-check — corruption is
/// recovered by the caller via a forced rebuild, never treated as fatal.
///
/// Implementations:
/// - `JsonFileStore` (write-temp-then-rename, JSON document)
/// - `InMemorySnapshotStore` (testing)
pub trait SnapshotStore: Send + Sync {
    fn save(
        &self,
        snapshot: &OracleSnapshot,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load(&self) -> impl Future<Output = Result<Option<OracleSnapshot>, StoreError>> + Send;

    /// Delete persisted state. Deleting nothing is not an error.
    fn clear(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// Shared handles delegate, so a test can inspect the store an oracle owns.
impl<S: SnapshotStore> SnapshotStore for Arc<S> {
    fn save(
        &self,
        snapshot: &OracleSnapshot,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).save(snapshot)
    }

    fn load(&self) -> impl Future<Output = Result<Option<OracleSnapshot>, StoreError>> + Send {
        (**self).load()
    }

    fn clear(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).clear()
    }
}
