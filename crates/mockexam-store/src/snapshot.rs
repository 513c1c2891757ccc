//! File-backed snapshot store.
//!
//! One JSON file per user under `<data_dir>/snapshots/`. Writes go to a
//! temporary file in the same directory and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::NamedTempFile;

use mockexam_core::model::SessionSnapshot;
use mockexam_core::traits::SnapshotStore;

use crate::error::{user_key, StoreError};

/// Snapshot store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store under `<data_dir>/snapshots`. The directory is created
    /// on first write.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("snapshots"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}.json", user_key(user_id)?)))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load_snapshot(&self, user_id: &str) -> Result<Option<SessionSnapshot>> {
        let path = self.path_for(user_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e).into()),
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                // An unreadable snapshot cannot be resumed; treat it as absent.
                tracing::warn!("ignoring unreadable snapshot {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    fn save_snapshot(&self, user_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let path = self.path_for(user_id)?;
        let bytes =
            serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::malformed(&path, e))?;
        self.write_atomic(&path, &bytes)?;
        Ok(())
    }

    fn clear_snapshot(&self, user_id: &str) -> Result<()> {
        let path = self.path_for(user_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e).into()),
        }
    }
}
