//! services/client/src/adapters/storage.rs
//!
//! Durable key-value storage adapters implementing the `KeyValueStore` port.
//! `FileStore` keeps every entry in a single JSON object on disk; `MemoryStore`
//! is the non-persistent variant used by embedders without a filesystem and
//! by tests.

use nutri_chat_core::ports::{KeyValueStore, PortError, PortResult};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

type Entries = BTreeMap<String, String>;

//=========================================================================================
// FileStore
//=========================================================================================

/// A JSON-file backed store. Entries are cached in memory and the whole map
/// is rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl FileStore {
    /// Opens the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load_from_disk(&path);
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn load_from_disk(path: &Path) -> Entries {
        if !path.exists() {
            info!("storage file not found at {:?}, starting empty", path);
            return Entries::new();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str::<Entries>(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(entries) => entries,
            Err(error) => {
                warn!("failed to read storage from {:?}: {}. starting empty", path, error);
                Entries::new()
            }
        }
    }

    fn persist(&self, entries: &Entries) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PortError::Storage(format!("failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Storage(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).map_err(|e| {
            PortError::Storage(format!("failed to write {:?}: {}", temp_path, e))
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            PortError::Storage(format!("failed to rename {:?}: {}", temp_path, e))
        })?;

        Ok(())
    }

    fn update<F>(&self, mutate: F) -> PortResult<()>
    where
        F: FnOnce(&mut Entries) -> bool,
    {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| PortError::Storage("storage lock poisoned".to_string()))?;

        // The cache only takes the change once it is on disk.
        let mut next = entries.clone();
        if mutate(&mut next) {
            self.persist(&next)?;
            *entries = next;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| PortError::Storage("storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

//=========================================================================================
// MemoryStore
//=========================================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| PortError::Storage("storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries
            .write()
            .map_err(|_| PortError::Storage("storage lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.entries
            .write()
            .map_err(|_| PortError::Storage("storage lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}
