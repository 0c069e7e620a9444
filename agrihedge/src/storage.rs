//! Key-value record store
//!
//! Stands in for browser local storage: string values under string keys.
//! Record lists are stored as JSON arrays.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub const CONTRACTS_KEY: &str = "contracts";
pub const HEDGE_POSITIONS_KEY: &str = "hedgePositions";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object file, rewritten on every change
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(FileStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Read a record list; a missing key is an empty list
pub fn load_records<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    match store.get(key)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

pub fn save_records<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, records: &[T]) -> Result<()> {
    let raw = serde_json::to_string(records)?;
    store.set(key, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn memory_store_basics() {
        let mut store = MemoryStore::default();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v".to_string()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn missing_key_loads_empty_list() {
        let store = MemoryStore::default();
        let records: Vec<u32> = load_records(&store, CONTRACTS_KEY).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn corrupt_value_is_a_json_error() {
        let mut store = MemoryStore::default();
        store.set(CONTRACTS_KEY, "not json".to_string()).unwrap();
        let err = load_records::<u32>(&store, CONTRACTS_KEY).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = FileStore::open(&path).unwrap();
        save_records(&mut store, HEDGE_POSITIONS_KEY, &[1, 2, 3]).unwrap();
        store.set("other", "x".to_string()).unwrap();
        store.remove("other").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        let records: Vec<i32> = load_records(&reopened, HEDGE_POSITIONS_KEY).unwrap();
        assert_eq!(records, vec![1, 2, 3]);
        assert_eq!(reopened.get("other").unwrap(), None);
    }

    #[test]
    fn empty_file_opens_as_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "").unwrap();
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(CONTRACTS_KEY).unwrap(), None);
    }
}
