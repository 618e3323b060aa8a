//! Durable session snapshots so an interrupted registration resumes at the
//! recorded step instead of restarting. Storage is injected so the engine
//! itself stays a pure state machine.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{StepForms, VisitorId, WizardStep};

/// Constant key under which the single kiosk session is stored.
pub const SNAPSHOT_KEY: &str = "visitor_registration";

/// The persisted subset of session state. Local photo binaries are excluded
/// by construction (`PhotoForm::local` is serde-skipped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub visitor_id: VisitorId,
    pub step: WizardStep,
    pub forms: StepForms,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait SnapshotStore: Send {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError>;
    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;
    fn clear(&self) -> Result<(), SnapshotError>;
}

/// File-backed store for a physical kiosk: one JSON document under a fixed
/// key in the configured directory.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{SNAPSHOT_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                // A corrupt snapshot means a fresh start, not a dead kiosk.
                warn!(path = %self.path.display(), %err, "discarding unreadable session snapshot");
                Ok(None)
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(snapshot)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local store used by the session service and tests.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    slot: Mutex<Option<Snapshot>>,
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        Ok(self.slot.lock().expect("snapshot mutex poisoned").clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        *self.slot.lock().expect("snapshot mutex poisoned") = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        *self.slot.lock().expect("snapshot mutex poisoned") = None;
        Ok(())
    }
}

impl SnapshotStore for std::sync::Arc<InMemorySnapshotStore> {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        self.as_ref().load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.as_ref().save(snapshot)
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        self.as_ref().clear()
    }
}
