//! mockexam-store — Local persistence for mockexam.
//!
//! File-backed snapshot and result stores rooted at a data directory, plus
//! an in-memory store for tests.

pub mod error;
pub mod memory;
pub mod results;
pub mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use results::FileResultStore;
pub use snapshot::FileSnapshotStore;

use mockexam_core::archive::ResultArchive;
use mockexam_core::traits::{ResultStore, SnapshotStore};

/// Both file stores for one data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
    snapshots: Arc<FileSnapshotStore>,
    results: Arc<FileResultStore>,
}

impl LocalStore {
    pub fn open(data_dir: &Path) -> Self {
        tracing::debug!("using data directory {}", data_dir.display());
        Self {
            data_dir: data_dir.to_path_buf(),
            snapshots: Arc::new(FileSnapshotStore::new(data_dir)),
            results: Arc::new(FileResultStore::new(data_dir)),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn snapshots(&self) -> Arc<dyn SnapshotStore> {
        self.snapshots.clone()
    }

    pub fn results(&self) -> Arc<dyn ResultStore> {
        self.results.clone()
    }

    pub fn archive(&self) -> ResultArchive {
        ResultArchive::new(self.results())
    }
}

/// Default data directory: `$XDG_DATA_HOME/mockexam` or `~/.local/share/mockexam`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir).join("mockexam");
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".local/share/mockexam"),
        None => PathBuf::from(".mockexam"),
    }
}
