//! Storage layer
//!
//! Raw key/value persistence for the named collections.
//!
//! ## Architecture
//!
//! - **Backends**: SQLite (default), one JSON file per collection, or memory
//! - **Keys**: one key per collection (`dh_cases`, `dh_contacts`, ...)
//! - **Values**: JSON-serialized arrays, or a JSON object for singletons
//!
//! Typed access lives in [`crate::store::Store`].

pub mod backend;
pub mod error;
pub mod keys;
pub mod persistence;
pub mod schema;
pub mod sqlite;

pub use backend::{BackendKind, KeyValueStore, MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use keys::Collection;
pub use persistence::JsonFileBackend;
pub use schema::{init_schema, needs_init, schema_version, SCHEMA_VERSION};
pub use sqlite::SqliteBackend;
