//! Key/value backends
//!
//! A backend stores raw JSON strings under collection keys. It knows nothing
//! about record types; typing happens in [`crate::store::Store`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::StorageResult;

/// Raw key/value persistence
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> StorageResult<()>;

    /// All keys currently present
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Approximate bytes used on disk (0 for in-memory backends)
    fn size_on_disk(&self) -> u64 {
        0
    }
}

/// Which backend the store should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One SQLite database file
    #[default]
    Sqlite,
    /// One JSON file per collection
    Json,
    /// Nothing persisted
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Json => "json",
            BackendKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "json" => Ok(BackendKind::Json),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!(
                "Unknown backend '{}'. Use 'sqlite', 'json' or 'memory'.",
                other
            )),
        }
    }
}

/// In-process backend, used by tests and `--backend memory`
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}
