use crate::error::{Error, Result};
use crate::models::app_state::AppState;
use crate::models::submission::Submission;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const LAST_SUBMISSION_KEY: &str = "exampro_last_submission";

/// String key-value store holding serialized blobs.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(Error::BadRequest(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves a half-written blob.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Internal("memory storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Internal("memory storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads and saves the root state blob under a fixed key.
#[derive(Clone)]
pub struct PersistenceService {
    storage: Arc<dyn Storage>,
    key: String,
}

impl PersistenceService {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Never fails: missing or unreadable data yields the seed state.
    pub fn load(&self) -> AppState {
        match self.storage.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<AppState>(&raw) {
                Ok(state) => {
                    tracing::info!(
                        key = %self.key,
                        exams = state.exams.len(),
                        submissions = state.submissions.len(),
                        "Application state loaded"
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "Stored state unparseable, using seed");
                    AppState::seed()
                }
            },
            Ok(None) => {
                tracing::info!(key = %self.key, "No stored state, using seed");
                AppState::seed()
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read stored state, using seed");
                AppState::seed()
            }
        }
    }

    pub fn save(&self, state: &AppState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        self.storage.set(&self.key, &raw)
    }

    pub fn save_last_submission(&self, submission: &Submission) -> Result<()> {
        let raw = serde_json::to_string(submission)?;
        self.storage.set(LAST_SUBMISSION_KEY, &raw)
    }

    /// Most recent submission, if it matches `submission_id`.
    pub fn last_submission(&self, submission_id: &str) -> Option<Submission> {
        let raw = match self.storage.get(LAST_SUBMISSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read last submission");
                return None;
            }
        };
        match serde_json::from_str::<Submission>(&raw) {
            Ok(sub) if sub.id == submission_id => Some(sub),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Last submission unparseable");
                None
            }
        }
    }
}
