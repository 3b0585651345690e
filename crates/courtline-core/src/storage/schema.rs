//! SQLite schema for the collection store
//!
//! One row per collection key. The value column holds the JSON-serialized
//! collection exactly as it would appear in a `<key>.json` file. The schema
//! version lives in `PRAGMA user_version`.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

const CREATE_COLLECTIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );
"#;

/// Create the collections table and stamp the schema version
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_COLLECTIONS)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Schema version recorded in the database (0 for a fresh file)
pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Whether the database predates the current schema
pub fn needs_init(conn: &Connection) -> bool {
    schema_version(conn).map_or(true, |v| v < SCHEMA_VERSION)
}
