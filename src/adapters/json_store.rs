use std::path::PathBuf;

use crate::domain::snapshot::OracleSnapshot;
use crate::ports::store::{SnapshotStore, StoreError};

/// File-backed snapshot store: one human-diffable JSON document.
///
/// Saves are atomic — the document is written to a sibling `.tmp` file and
/// renamed over the target, so a crash mid-write never leaves a partial
/// snapshot. Loads self-validate: an unparseable document or a failed
/// snapshot self-check is logged and reported as `None` (corruption is the
/// caller's cue to force a rebuild, not a fatal error).
pub struct JsonFileStore {
    path: PathBuf,
    /// Tree depth the snapshot must validate against.
    depth: usize,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, depth: usize) -> Self {
        Self {
            path: path.into(),
            depth,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

impl SnapshotStore for JsonFileStore {
    async fn save(&self, snapshot: &OracleSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<OracleSnapshot>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: OracleSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "snapshot unparseable, treating as corrupt");
                return Ok(None);
            }
        };

        if let Err(e) = snapshot.self_check(self.depth) {
            tracing::warn!(path = %self.path.display(), error = %e, "snapshot failed self-check, treating as corrupt");
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
