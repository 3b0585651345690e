//! Unified storage interface
//!
//! The `Store` wraps a [`KeyValueStore`] backend and gives typed access to
//! the named collections.
//!
//! ## Collections
//!
//! Each collection is one JSON array stored under its key (`dh_cases`,
//! `dh_contacts`, ...). Every operation is a read-modify-write of the whole
//! array. Singleton settings are stored as a single JSON object.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! let case = store.add(Case::new("JV-2024-001", "In re Smith", CaseType::Dependency))?;
//! let updated: Option<Case> = store.update(case.id, &json!({ "status": "active" }))?;
//! let all: Vec<Case> = store.get_all()?;
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{later_than, MessageTemplate, Mutable, Record, Setting};
use crate::storage::{
    BackendKind, Collection, JsonFileBackend, KeyValueStore, MemoryBackend, SqliteBackend,
    StorageError,
};

/// Fields an update patch may never change
const PROTECTED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// Typed storage for all Courtline collections
pub struct Store {
    backend: Box<dyn KeyValueStore>,
    config: Config,
}

impl Store {
    /// Open the store using the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        let backend: Box<dyn KeyValueStore> = match config.backend {
            BackendKind::Sqlite => Box::new(
                SqliteBackend::open(&config.sqlite_path())
                    .context("Failed to open SQLite database")?,
            ),
            BackendKind::Json => Box::new(
                JsonFileBackend::open(&config.collections_dir())
                    .context("Failed to open collections directory")?,
            ),
            BackendKind::Memory => Box::new(MemoryBackend::new()),
        };
        debug!("Opened {} store in {:?}", config.backend, config.data_dir);
        Ok(Self::with_backend(backend, config))
    }

    /// Build a store over an existing backend
    pub fn with_backend(backend: Box<dyn KeyValueStore>, config: Config) -> Self {
        Self { backend, config }
    }

    /// A throwaway store that persists nothing
    pub fn in_memory() -> Self {
        let config = Config {
            backend: BackendKind::Memory,
            simulate_latency: false,
            ..Config::default()
        };
        Self::with_backend(Box::new(MemoryBackend::new()), config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Raw collections ====================

    /// Read a whole collection. An absent key is an empty collection.
    pub fn get<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let key = collection.key();
        let raw = self
            .backend
            .get(key)
            .with_context(|| format!("Failed to read {}", key))?;

        match raw {
            None => Ok(Vec::new()),
            Some(json) => {
                let items = serde_json::from_str(&json).map_err(|e| StorageError::corrupt(key, e))?;
                Ok(items)
            }
        }
    }

    /// Replace a whole collection
    pub fn set<T: Serialize>(&mut self, collection: Collection, items: &[T]) -> Result<()> {
        let key = collection.key();
        let json = serde_json::to_string(items)
            .with_context(|| format!("Failed to serialize {}", key))?;
        debug!("Writing {} record(s) to {}", items.len(), key);
        self.backend
            .set(key, &json)
            .with_context(|| format!("Failed to write {}", key))
    }

    /// Remove a collection entirely
    pub fn clear(&mut self, collection: Collection) -> Result<()> {
        debug!("Clearing {}", collection);
        self.backend
            .remove(collection.key())
            .with_context(|| format!("Failed to clear {}", collection))
    }

    // ==================== Records ====================

    pub fn get_all<T: Record>(&self) -> Result<Vec<T>> {
        self.get(T::COLLECTION)
    }

    pub fn get_by_id<T: Record>(&self, id: Uuid) -> Result<Option<T>> {
        Ok(self.get_all::<T>()?.into_iter().find(|r| r.id() == id))
    }

    /// Records whose id starts with `prefix` (a full id matches exactly one)
    pub fn find_by_prefix<T: Record>(&self, prefix: &str) -> Result<Vec<T>> {
        let prefix = prefix.trim().to_lowercase();
        Ok(self
            .get_all::<T>()?
            .into_iter()
            .filter(|r| r.id().to_string().starts_with(&prefix))
            .collect())
    }

    /// Append a record with a fresh id and timestamps, returning it
    pub fn add<T: Record>(&mut self, mut item: T) -> Result<T> {
        item.assign_identity(Uuid::new_v4(), Utc::now());
        let mut items = self.get_all::<T>()?;
        items.push(item.clone());
        self.set(T::COLLECTION, &items)?;
        Ok(item)
    }

    /// Insert a record at the front of its collection (newest first)
    pub fn prepend<T: Record>(&mut self, mut item: T) -> Result<T> {
        item.assign_identity(Uuid::new_v4(), Utc::now());
        let mut items = self.get_all::<T>()?;
        items.insert(0, item.clone());
        self.set(T::COLLECTION, &items)?;
        Ok(item)
    }

    /// Shallow-merge a JSON object patch into the record with `id`
    ///
    /// `id`, `createdAt` and `updatedAt` in the patch are ignored; `updatedAt`
    /// is stamped strictly later than its previous value. Returns `None` when
    /// no record has that id.
    pub fn update<T: Mutable>(&mut self, id: Uuid, patch: &Value) -> Result<Option<T>> {
        let Some(patch) = patch.as_object() else {
            bail!("Update patch must be a JSON object");
        };

        let mut items = self.get_all::<T>()?;
        let Some(pos) = items.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };

        let previous = items[pos].updated_at();
        let mut merged = serde_json::to_value(&items[pos])?;
        if let Value::Object(fields) = &mut merged {
            for (field, value) in patch {
                if PROTECTED_FIELDS.contains(&field.as_str()) {
                    continue;
                }
                fields.insert(field.clone(), value.clone());
            }
        }

        let mut updated: T = serde_json::from_value(merged)
            .with_context(|| format!("Invalid update for {} {}", T::COLLECTION, id))?;
        updated.set_updated_at(later_than(previous, Utc::now()));

        items[pos] = updated.clone();
        self.set(T::COLLECTION, &items)?;
        Ok(Some(updated))
    }

    /// Apply an in-place edit to the record with `id`
    ///
    /// Unlike [`Store::update`], fields the closure sets to `None` are
    /// cleared. The id and `createdAt` are restored if the closure touches
    /// them; `updatedAt` is stamped as in `update`.
    pub fn modify<T: Mutable>(&mut self, id: Uuid, edit: impl FnOnce(&mut T)) -> Result<Option<T>> {
        let mut items = self.get_all::<T>()?;
        let Some(pos) = items.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };

        let original = items[pos].clone();
        let mut record = original.clone();
        edit(&mut record);
        let mut record = keep_identity(&original, &record)?;
        record.set_updated_at(later_than(original.updated_at(), Utc::now()));

        items[pos] = record.clone();
        self.set(T::COLLECTION, &items)?;
        Ok(Some(record))
    }

    /// Remove the record with `id`. Returns whether one was removed.
    pub fn delete<T: Mutable>(&mut self, id: Uuid) -> Result<bool> {
        let mut items = self.get_all::<T>()?;
        let before = items.len();
        items.retain(|r| r.id() != id);
        if items.len() == before {
            return Ok(false);
        }
        self.set(T::COLLECTION, &items)?;
        Ok(true)
    }

    // ==================== Settings ====================

    /// Load a singleton setting, or its defaults when none is stored
    pub fn load_setting<T: Setting>(&self) -> Result<T> {
        let key = T::COLLECTION.key();
        let raw = self
            .backend
            .get(key)
            .with_context(|| format!("Failed to read {}", key))?;
        match raw {
            None => Ok(T::default()),
            Some(json) => Ok(serde_json::from_str(&json).map_err(|e| StorageError::corrupt(key, e))?),
        }
    }

    /// Store a singleton setting, stamping its modification time
    pub fn save_setting<T: Setting>(&mut self, mut value: T) -> Result<T> {
        value.touch(Utc::now());
        let key = T::COLLECTION.key();
        let json = serde_json::to_string(&value)?;
        debug!("Writing setting {}", key);
        self.backend
            .set(key, &json)
            .with_context(|| format!("Failed to write {}", key))?;
        Ok(value)
    }

    // ==================== Maintenance ====================

    /// Install the default message templates when there are none.
    /// Returns how many were added.
    pub fn seed_default_templates(&mut self) -> Result<usize> {
        if !self.get_all::<MessageTemplate>()?.is_empty() {
            return Ok(0);
        }
        let defaults = MessageTemplate::defaults();
        let count = defaults.len();
        for template in defaults {
            self.add(template)?;
        }
        Ok(count)
    }

    /// Number of records in each array collection
    pub fn collection_counts(&self) -> Result<Vec<(Collection, usize)>> {
        Collection::ALL
            .iter()
            .filter(|c| !c.is_singleton())
            .map(|&c| Ok((c, self.get::<Value>(c)?.len())))
            .collect()
    }

    /// Keys currently present in the backend
    pub fn keys(&self) -> Result<Vec<String>> {
        self.backend.keys().context("Failed to list keys")
    }

    pub fn size_on_disk(&self) -> u64 {
        self.backend.size_on_disk()
    }
}

/// `edited` with `id` and `createdAt` taken from `original`
fn keep_identity<T: Record>(original: &T, edited: &T) -> Result<T> {
    let mut value = serde_json::to_value(edited)?;
    if let (Value::Object(fields), Value::Object(source)) =
        (&mut value, serde_json::to_value(original)?)
    {
        for field in ["id", "createdAt"] {
            if let Some(v) = source.get(field) {
                fields.insert(field.to_string(), v.clone());
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}
