//! Courtline Core Library
//!
//! Case records, contacts and SMS outreach for a dependency court. All state
//! lives in a local key/value store: each collection is a JSON array under a
//! fixed key, and settings are singleton JSON objects.
//!
//! # Architecture
//!
//! - **Storage**: a [`KeyValueStore`](storage::KeyValueStore) backend
//!   (SQLite by default, JSON files, or memory)
//! - **Store**: typed CRUD over the collections, the main entry point
//! - **Services**: outbox, inbox, integrations and audit operate on a `&mut Store`
//!
//! Sending, receiving and integration runs are simulated; nothing leaves the
//! machine.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//!
//! let case = store.add(Case::new("JV-2024-001", "In re Doe", CaseType::Dependency))?;
//! log_case_action(&mut store, AuditAction::Create, case.id, "Created case", vec![])?;
//!
//! let report = reports::generate(&store, Utc::now())?;
//! ```
//!
//! # Modules
//!
//! - `store`: typed storage interface
//! - `models`: records and settings
//! - `storage`: key/value backends
//! - `validation`: field validators and per-record checks
//! - `messaging`: templates, segments and reminder timing
//! - `outbox` / `inbox`: simulated SMS send and receive
//! - `integration`: simulated external-system runs
//! - `audit`: audit trail
//! - `reports`: summary statistics
//! - `config`: application configuration

pub mod audit;
pub mod config;
pub mod inbox;
pub mod integration;
pub mod messaging;
pub mod models;
pub mod outbox;
pub mod reports;
pub mod storage;
pub mod store;
pub mod validation;

pub use config::Config;
pub use models::{
    AuditLog, Case, Contact, Document, IncomingMessage, IntegrationConfig, Message,
    MessageHistory, Participant,
};
pub use storage::{BackendKind, StorageError};
pub use store::Store;
pub use validation::{Validate, ValidationErrors};
