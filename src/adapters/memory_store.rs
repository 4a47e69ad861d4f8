use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::domain::snapshot::OracleSnapshot;
use crate::ports::store::{SnapshotStore, StoreError};

/// In-memory implementation of `SnapshotStore` for testing.
///
/// `fail_next_save` makes the next save return an error once, for exercising
/// the oracle's persist-failure rollback.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    inner: Mutex<Option<OracleSnapshot>>,
    fail_next_save: AtomicBool,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &OracleSnapshot) -> Result<(), StoreError> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Internal("injected save failure".to_string()));
        }
        *self.inner.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<OracleSnapshot>, StoreError> {
        Ok(self.inner.lock().await.clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
