//! Snapshot persistence.
//!
//! A store holds exactly one snapshot and only ever replaces it whole. There
//! is no append or merge path: `save` is the single mutator of durable state.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Snapshot;

/// Load and save a full key to value snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Read the snapshot. A missing resource is an empty snapshot.
    fn load(&self) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Replace the snapshot with `snapshot`.
    fn save(&self, snapshot: &Snapshot) -> impl Future<Output = Result<()>> + Send;

    /// Identifier shown in logs (a path for file-backed stores).
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Snapshot stored as a UTF-8 JSON object in a single file.
///
/// Saves write a sibling temp file and rename it over the target, so the
/// file on disk is always either the previous or the new snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn resource(&self) -> String {
        self.path.display().to_string()
    }
}

impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Snapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot on disk, starting empty");
                return Ok(Snapshot::new());
            }
            Err(e) => return Err(Error::storage(self.resource(), e)),
        };

        serde_json::from_str(&content).map_err(|e| Error::storage(self.resource(), e))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(snapshot).map_err(|e| Error::storage(self.resource(), e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(self.resource(), e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| Error::storage(self.resource(), e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| Error::storage(self.resource(), e))?;

        debug!(path = %self.path.display(), len = snapshot.len(), "snapshot saved");
        Ok(())
    }

    fn describe(&self) -> String {
        self.resource()
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Store kept in process memory (for testing and embedding).
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `snapshot`, as if saved by an earlier run.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    /// Last saved snapshot, `None` if nothing was ever stored.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot().unwrap_or_default())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
