//! Key-value persistence for snapshots that outlive the window.
//!
//! Values are JSON documents addressed by the well-known keys below. The
//! mock host keeps its data here too, so it behaves like browser local
//! storage for a desktop process.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

pub mod json_file;

pub use json_file::JsonFileStorage;

pub const API_CONFIG: &str = "api_config";
pub const CHAT_SESSIONS: &str = "chat_sessions";
pub const HAS_VISITED: &str = "hasVisited";
pub const SETTINGS: &str = "settings";
pub const THEME: &str = "theme";
pub const LANGUAGE: &str = "language";
pub const APP_STORAGE: &str = "app-storage";
pub const CHAT_STORAGE: &str = "chat-storage";
pub const CONFIG_STORAGE: &str = "config-storage";

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads `key` and decodes it; a missing key is `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Result<Option<T>> {
    match storage.get(key) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize + ?Sized>(storage: &dyn KeyValueStorage, key: &str, value: &T) -> Result<()> {
    storage.set(key, serde_json::to_value(value)?)
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Writes `bytes` next to `path` and renames over it.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, bytes)?;
    match fs::rename(tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // Some platforms refuse to rename over an existing file.
            if path.exists() {
                fs::remove_file(path)?;
                fs::rename(tmp_path, path)
            } else {
                Err(rename_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        count: u32,
    }

    #[test]
    fn typed_helpers_round_trip_through_memory() {
        let storage = MemoryStorage::new();
        assert_eq!(load_json::<Snapshot>(&storage, "k").expect("missing is ok"), None);

        save_json(&storage, "k", &Snapshot { count: 3 }).expect("save should succeed");
        assert_eq!(
            load_json::<Snapshot>(&storage, "k").expect("load should succeed"),
            Some(Snapshot { count: 3 })
        );

        storage.remove("k").expect("remove should succeed");
        assert!(storage.get("k").is_none());
    }

    #[test]
    fn load_json_reports_shape_mismatch() {
        let storage = MemoryStorage::new();
        storage
            .set("k", Value::String("not a snapshot".to_string()))
            .expect("set should succeed");
        assert!(load_json::<Snapshot>(&storage, "k").is_err());
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("data.json");
        write_atomic(&path, b"one").expect("first write");
        write_atomic(&path, b"two").expect("second write");
        assert_eq!(fs::read(&path).expect("read back"), b"two");
        assert!(!dir.path().join("nested").join("data.json.tmp").exists());
    }
}
