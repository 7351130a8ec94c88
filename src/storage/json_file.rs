use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{write_atomic, KeyValueStorage};
use crate::error::{HostError, Result};

/// All keys in one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened local storage");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        write_atomic(&self.path, &bytes).map_err(|err| {
            HostError::Storage(format!("failed to write {}: {err}", self.path.display()))
        })
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, Value>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let data = fs::read(path)
        .map_err(|err| HostError::Storage(format!("failed to read {}: {err}", path.display())))?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    serde_json::from_slice(&data)
        .map_err(|err| HostError::Storage(format!("failed to parse {}: {err}", path.display())))
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("local-storage.json");

        let storage = JsonFileStorage::open(&path).expect("open empty");
        storage.set("theme", json!("dark")).expect("set theme");
        storage.set("hasVisited", json!(true)).expect("set flag");
        storage.remove("hasVisited").expect("remove flag");
        drop(storage);

        let reopened = JsonFileStorage::open(&path).expect("reopen");
        assert_eq!(reopened.get("theme"), Some(json!("dark")));
        assert_eq!(reopened.get("hasVisited"), None);
    }

    #[test]
    fn empty_file_opens_as_empty_storage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("local-storage.json");
        fs::write(&path, "  \n").expect("write blank file");

        let storage = JsonFileStorage::open(&path).expect("blank file should open");
        assert!(storage.get("settings").is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("local-storage.json");
        fs::write(&path, "{not json").expect("write corrupt file");

        let error = JsonFileStorage::open(&path).expect_err("corrupt file should fail");
        assert!(error.to_string().contains("failed to parse"));
    }
}
