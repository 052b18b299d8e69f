//! Durable checkpoint storage.
//!
//! The store holds one flat document per exporter: counter name to last
//! accepted value. It is read once at the start of a run and replaced
//! wholesale after the recorder confirmed the append; it is never partially
//! updated mid-run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sunex_schemas::Checkpoint;

/// Errors a checkpoint store may return. The taxonomy is closed: decode
/// failures of a corrupt document surface as `Unavailable` too, with the
/// cause in the message.
#[derive(Debug)]
pub enum CheckpointStoreError {
    /// I/O failure, or an undecodable persisted document.
    Unavailable(String),
}

impl std::fmt::Display for CheckpointStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointStoreError::Unavailable(msg) => {
                write!(f, "checkpoint store unavailable: {msg}")
            }
        }
    }
}

impl std::error::Error for CheckpointStoreError {}

/// Durable mapping from counter name to last accepted value.
///
/// The store's identity (file path, cluster object name, ...) is injected at
/// construction. `found == false` means no prior run ever recorded a
/// checkpoint here; callers treat that as the empty mapping.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<(Checkpoint, bool), CheckpointStoreError>;

    /// Overwrites the whole document atomically.
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointStoreError>;
}

/// File-backed checkpoint store. Mirrors the mounted state file the exporter
/// reads between scheduled runs.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<(Checkpoint, bool), CheckpointStoreError> {
        if !self.path.exists() {
            return Ok((Checkpoint::empty(), false));
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| CheckpointStoreError::Unavailable(format!("read {:?}: {e}", self.path)))?;

        // An empty document is equivalent to an empty mapping.
        if raw.trim().is_empty() {
            return Ok((Checkpoint::empty(), true));
        }

        let checkpoint: Checkpoint = serde_json::from_str(&raw).map_err(|e| {
            CheckpointStoreError::Unavailable(format!("decode {:?}: {e}", self.path))
        })?;

        Ok((checkpoint, true))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointStoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|e| CheckpointStoreError::Unavailable(format!("create {parent:?}: {e}")))?;

        let body = serde_json::to_string(checkpoint)
            .map_err(|e| CheckpointStoreError::Unavailable(format!("encode checkpoint: {e}")))?;

        // Write a sibling temp file, then rename over the target so a crashed
        // run can never leave a half-written document behind.
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| CheckpointStoreError::Unavailable(format!("temp file: {e}")))?;
        tmp.write_all(body.as_bytes())
            .map_err(|e| CheckpointStoreError::Unavailable(format!("write temp file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| CheckpointStoreError::Unavailable(format!("persist {:?}: {e}", self.path)))?;

        Ok(())
    }
}
