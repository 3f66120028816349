//! Session backends that hold onboarding namespaces.
//!
//! A backend maps session keys to JSON objects. [`MemorySession`] keeps them
//! in process memory; [`FileSession`] persists them to a JSON file so the
//! command line wizard can resume between runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::error::StorageError;

/// Contents of one onboarding namespace
pub type Namespace = Map<String, Value>;

/// Session store that onboarding namespaces are written into
pub trait SessionBackend: Send + Sync {
    /// Load the mapping stored under `key`
    fn load(&self, key: &str) -> Result<Option<Namespace>, StorageError>;

    /// Replace the mapping stored under `key`
    fn store(&self, key: &str, data: Namespace) -> Result<(), StorageError>;
}

/// In-memory session. Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    data: Arc<Mutex<HashMap<String, Namespace>>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw namespace under `key` (for test assertions)
    pub fn raw(&self, key: &str) -> Option<Namespace> {
        self.data.lock().ok()?.get(key).cloned()
    }

    /// Drop a session key entirely, as an expiring session would
    pub fn forget(&self, key: &str) {
        if let Ok(mut data) = self.data.lock() {
            data.remove(key);
        }
    }
}

impl SessionBackend for MemorySession {
    fn load(&self, key: &str) -> Result<Option<Namespace>, StorageError> {
        let data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data.get(key).cloned())
    }

    fn store(&self, key: &str, namespace: Namespace) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        data.insert(key.to_string(), namespace);
        Ok(())
    }
}

/// Session persisted as a single JSON object on disk.
///
/// The file is read once on open and rewritten on every store. A store
/// that fails to write leaves the session unchanged.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    data: Mutex<Map<String, Value>>,
}

impl FileSession {
    /// Open the session file at `path`, starting empty if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Map::new()
        };
        tracing::debug!(path = %path.display(), keys = data.len(), "opened session file");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl SessionBackend for FileSession {
    fn load(&self, key: &str) -> Result<Option<Namespace>, StorageError> {
        let data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        match data.get(key) {
            None => Ok(None),
            Some(Value::Object(namespace)) => Ok(Some(namespace.clone())),
            Some(_) => Err(StorageError::CorruptNamespace(key.to_string())),
        }
    }

    fn store(&self, key: &str, namespace: Namespace) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        let mut updated = data.clone();
        updated.insert(key.to_string(), Value::Object(namespace));
        // memory only reflects what reached disk
        self.flush(&updated)?;
        *data = updated;
        Ok(())
    }
}
