//! SQLite backend
//!
//! Stores each collection as a single row in the `collections` table.
//! This is the default backend.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::backend::KeyValueStore;
use super::error::{StorageError, StorageResult};
use super::schema::{init_schema, needs_init};

/// SQLite-backed key/value store
pub struct SqliteBackend {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open or create the SQLite database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::DataDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        debug!("Opened SQLite store at {:?}", path);

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }
}

impl KeyValueStore for SqliteBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM collections WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM collections WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM collections ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn size_on_disk(&self) -> u64 {
        self.path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend.get("dh_cases").unwrap().is_none());

        backend.set("dh_cases", r#"[{"id":"a"}]"#).unwrap();
        assert_eq!(
            backend.get("dh_cases").unwrap().as_deref(),
            Some(r#"[{"id":"a"}]"#)
        );

        // Overwrite replaces the row
        backend.set("dh_cases", "[]").unwrap();
        assert_eq!(backend.get("dh_cases").unwrap().as_deref(), Some("[]"));
        assert_eq!(backend.keys().unwrap().len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        backend.set("dh_contacts", "[]").unwrap();
        backend.remove("dh_contacts").unwrap();
        assert!(backend.get("dh_contacts").unwrap().is_none());
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("courtline.db");

        {
            let mut backend = SqliteBackend::open(&path).unwrap();
            backend.set("dh_documents", "[1,2,3]").unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.get("dh_documents").unwrap().as_deref(), Some("[1,2,3]"));
        assert!(backend.size_on_disk() > 0);
    }
}
