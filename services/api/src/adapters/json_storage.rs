//! services/api/src/adapters/json_storage.rs
//!
//! This module contains the persistence adapter, the concrete implementation
//! of the `SnapshotStorage` port from the `core` crate. Each record is one JSON
//! file in the data directory, replaced atomically on every save.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use study_assistant_core::ports::{PortError, PortResult, SnapshotStorage};
use tokio::runtime::{Handle, RuntimeFlavor};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that keeps each store snapshot in `<dir>/<record>.json`.
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    /// Creates a new `JsonFileStorage`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, record: &str) -> PortResult<PathBuf> {
        let valid = !record.is_empty()
            && record
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PortError::Storage(format!("Invalid record name '{}'", record)));
        }
        Ok(self.dir.join(format!("{}.json", record)))
    }
}

//=========================================================================================
// `SnapshotStorage` Trait Implementation
//=========================================================================================

impl SnapshotStorage for JsonFileStorage {
    fn load(&self, record: &str) -> PortResult<Option<String>> {
        let path = self.record_path(record)?;
        match fs::read_to_string(&path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, record: &str, payload: &str) -> PortResult<()> {
        let path = self.record_path(record)?;
        let tmp_path = path.with_extension("json.tmp");

        blocking(|| {
            // Write and flush the whole payload next to the target, then swap it in.
            write_synced(&tmp_path, payload).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                PortError::Storage(format!("Failed to write {}: {}", tmp_path.display(), e))
            })?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                PortError::Storage(format!("Failed to replace {}: {}", path.display(), e))
            })
        })
    }
}

fn write_synced(path: &Path, payload: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(payload.as_bytes())?;
    file.sync_all()
}

/// Runs filesystem work off the async scheduler when called from a
/// multi-threaded runtime. Elsewhere the closure simply runs inline.
fn blocking<R>(work: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}
