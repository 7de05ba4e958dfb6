//! Durable key/value storage for harness settings
//!
//! Values are plain strings keyed by the names in [`crate::constants::storage_keys`].
//! Every key is independent: a malformed value for one key never hides the others.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Storage backend failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key/value storage with an all-or-nothing multi-key write
pub trait KeyValueStorage {
    /// Read one key. `None` when absent or when the stored value is not a string.
    fn get(&self, key: &str) -> Option<String>;

    /// Write every entry or none of them
    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StorageError>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        (**self).set_many(entries)
    }
}

/// In-memory storage, used with `--ephemeral` and in tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value directly, bypassing change detection
    #[cfg(test)]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

/// Flat JSON object on disk, replaced via temp file + rename
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Map<String, Value>,
}

impl FileStorage {
    /// Default settings path under the user config directory
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Open the default settings file
    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// Open settings at `path`. A missing or unparseable file yields empty storage;
    /// every key then falls back to its default.
    pub fn open(path: PathBuf) -> Self {
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => {
                    debug!(path = %path.display(), keys = map.len(), "Loaded settings file");
                    map
                }
                Ok(other) => {
                    warn!(path = %path.display(), kind = json_kind(&other), "Settings file is not a JSON object, ignoring contents");
                    Map::new()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse settings file, ignoring contents");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file yet");
                Map::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read settings file");
                Map::new()
            }
        };

        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, values: &Map<String, Value>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => {
                warn!(key, kind = json_kind(other), "Stored value is not a string, treating as absent");
                None
            }
        }
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut next = self.values.clone();
        for (key, value) in entries {
            next.insert((*key).to_string(), Value::String(value.clone()));
        }

        // Memory only follows once the file is in place
        self.write_atomic(&next)?;
        self.values = next;
        debug!(path = %self.path.display(), count = entries.len(), "Persisted settings");
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_set_many() {
        let mut storage = MemoryStorage::new();
        storage
            .set_many(&[("a", "1".to_string()), ("b", "2".to_string())])
            .unwrap();

        assert_eq!(storage.get("a").as_deref(), Some("1"));
        assert_eq!(storage.get("b").as_deref(), Some("2"));
        assert_eq!(storage.get("c"), None);
    }

    #[test]
    fn test_file_storage_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut storage = FileStorage::open(path.clone());
        storage
            .set_many(&[("iframe-layout-mode", "modal".to_string())])
            .unwrap();

        let reopened = FileStorage::open(path.clone());
        assert_eq!(reopened.get("iframe-layout-mode").as_deref(), Some("modal"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_storage_non_string_value_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"iframe-layout-mode": 7, "environment-selector": "CUSTOM"}"#).unwrap();

        let storage = FileStorage::open(path);
        assert_eq!(storage.get("iframe-layout-mode"), None);
        assert_eq!(storage.get("environment-selector").as_deref(), Some("CUSTOM"));
    }

    #[test]
    fn test_file_storage_garbage_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json at all").unwrap();

        let storage = FileStorage::open(path);
        assert_eq!(storage.get("environment-selector"), None);
    }

    #[test]
    fn test_file_storage_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"theme-mode": "light"}"#).unwrap();

        let mut storage = FileStorage::open(path.clone());
        storage.set_many(&[("base-url", "http://localhost:5173".to_string())]).unwrap();

        let reopened = FileStorage::open(path);
        assert_eq!(reopened.get("theme-mode").as_deref(), Some("light"));
        assert_eq!(reopened.get("base-url").as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn test_file_storage_failed_replace_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"theme-mode": "light"}"#).unwrap();
        let mut storage = FileStorage::open(path.clone());

        // A directory in place of the file makes the final rename fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let err = storage
            .set_many(&[("base-url", "http://localhost:5173".to_string())])
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert_eq!(storage.get("base-url"), None);
        assert_eq!(storage.get("theme-mode").as_deref(), Some("light"));
    }
}
