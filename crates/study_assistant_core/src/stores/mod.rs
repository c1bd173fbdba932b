//! crates/study_assistant_core/src/stores/mod.rs
//!
//! The four application stores. Each store is an explicitly constructed object
//! that owns its state, exposes a mutation API, and writes a snapshot of that
//! state through a `SnapshotStorage` after every successful mutation.

pub mod conversations;
pub mod planner;
pub mod settings;
pub mod study_cards;

pub use conversations::ConversationStore;
pub use planner::PlannerStore;
pub use settings::SettingsStore;
pub use study_cards::StudyCardStore;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ports::{PortError, PortResult, SnapshotStorage};

/// Record names of the four persisted stores.
pub const CHAT_RECORD: &str = "synapse-chat";
pub const QUIZ_RECORD: &str = "synapse-quiz";
pub const PLANNER_RECORD: &str = "synapse-planner";
pub const SETTINGS_RECORD: &str = "synapse-settings";

const SNAPSHOT_VERSION: u32 = 0;

/// On-disk wrapper around a store's state.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    version: u32,
}

/// Loads and saves one store's snapshot under a fixed record name.
#[derive(Clone)]
pub(crate) struct Persistor {
    storage: Arc<dyn SnapshotStorage>,
    record: &'static str,
}

impl Persistor {
    pub(crate) fn new(storage: Arc<dyn SnapshotStorage>, record: &'static str) -> Self {
        Self { storage, record }
    }

    /// Reads the saved state, or the default state when nothing was saved yet.
    pub(crate) fn load<T: DeserializeOwned + Default>(&self) -> PortResult<T> {
        match self.storage.load(self.record)? {
            Some(payload) => {
                let envelope: Envelope<T> = serde_json::from_str(&payload).map_err(|e| {
                    PortError::Storage(format!("Corrupt snapshot '{}': {}", self.record, e))
                })?;
                if envelope.version != SNAPSHOT_VERSION {
                    tracing::warn!(
                        record = self.record,
                        version = envelope.version,
                        "Snapshot written by a different version; loading as-is"
                    );
                }
                Ok(envelope.state)
            }
            None => Ok(T::default()),
        }
    }

    pub(crate) fn save<T: Serialize>(&self, state: &T) -> PortResult<()> {
        let payload = serde_json::to_string(&Envelope {
            state,
            version: SNAPSHOT_VERSION,
        })
        .map_err(|e| PortError::Storage(e.to_string()))?;
        self.storage.save(self.record, &payload)
    }

    /// Applies `change` to a copy of `state` and keeps the copy only once it is
    /// saved. On any error `state` is left exactly as it was.
    pub(crate) fn commit<T, R>(
        &self,
        state: &mut T,
        change: impl FnOnce(&mut T) -> PortResult<R>,
    ) -> PortResult<R>
    where
        T: Clone + Serialize,
    {
        let mut next = state.clone();
        let result = change(&mut next)?;
        self.save(&next)?;
        *state = next;
        Ok(result)
    }
}

/// A `SnapshotStorage` whose writes always fail, for rollback tests.
#[cfg(test)]
pub(crate) struct FailingStorage;

#[cfg(test)]
impl SnapshotStorage for FailingStorage {
    fn load(&self, _record: &str) -> PortResult<Option<String>> {
        Ok(None)
    }

    fn save(&self, _record: &str, _payload: &str) -> PortResult<()> {
        Err(PortError::Storage("disk full".to_string()))
    }
}

/// Process-local `SnapshotStorage`, used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload currently stored under `record`.
    pub fn payload(&self, record: &str) -> Option<String> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(record).cloned())
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self, record: &str) -> PortResult<Option<String>> {
        let records = self
            .records
            .lock()
            .map_err(|_| PortError::Storage("memory storage lock poisoned".to_string()))?;
        Ok(records.get(record).cloned())
    }

    fn save(&self, record: &str, payload: &str) -> PortResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| PortError::Storage("memory storage lock poisoned".to_string()))?;
        records.insert(record.to_string(), payload.to_string());
        Ok(())
    }
}
