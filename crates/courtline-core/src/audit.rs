//! Audit logger
//!
//! Appends an [`AuditLog`] record for each significant mutation. The acting
//! user comes from [`Config`](crate::Config) since there is no login.
//! Entries are never rotated or pruned.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::models::{AuditAction, AuditLog, EntityType, FieldChange, Severity};
use crate::store::Store;

/// Fields that change on every write and are left out of diffs
const DIFF_IGNORED: &[&str] = &["updatedAt"];

/// An audit record before it is stamped and stored
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub description: String,
    pub changes: Option<Vec<FieldChange>>,
    pub severity: Severity,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        entity_type: EntityType,
        entity_id: impl ToString,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            description: description.into(),
            changes: None,
            severity: Severity::Info,
        }
    }

    /// Attach field changes; an empty list is dropped
    pub fn with_changes(mut self, changes: Vec<FieldChange>) -> Self {
        self.changes = (!changes.is_empty()).then_some(changes);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Append an audit record as the configured user
pub fn log_audit(store: &mut Store, entry: AuditEntry) -> Result<AuditLog> {
    let config = store.config();
    let log = AuditLog {
        id: Uuid::nil(),
        timestamp: Utc::now(),
        user_id: config.user_id.clone(),
        user_name: config.user_name.clone(),
        action: entry.action,
        entity_type: entry.entity_type,
        entity_id: entry.entity_id,
        changes: entry.changes,
        ip_address: None,
        user_agent: None,
        severity: entry.severity,
        description: entry.description,
    };

    info!(
        action = %log.action,
        entity = %log.entity_type,
        id = %log.entity_id,
        "{}",
        log.description
    );
    store.add(log).context("Failed to write audit log")
}

pub fn log_case_action(
    store: &mut Store,
    action: AuditAction,
    case_id: impl ToString,
    description: impl Into<String>,
    changes: Vec<FieldChange>,
) -> Result<AuditLog> {
    log_audit(
        store,
        AuditEntry::new(action, EntityType::Case, case_id, description).with_changes(changes),
    )
}

pub fn log_contact_action(
    store: &mut Store,
    action: AuditAction,
    contact_id: impl ToString,
    description: impl Into<String>,
    changes: Vec<FieldChange>,
) -> Result<AuditLog> {
    log_audit(
        store,
        AuditEntry::new(action, EntityType::Contact, contact_id, description).with_changes(changes),
    )
}

pub fn log_message_action(
    store: &mut Store,
    action: AuditAction,
    message_id: impl ToString,
    description: impl Into<String>,
    changes: Vec<FieldChange>,
) -> Result<AuditLog> {
    log_audit(
        store,
        AuditEntry::new(action, EntityType::Message, message_id, description).with_changes(changes),
    )
}

pub fn log_document_action(
    store: &mut Store,
    action: AuditAction,
    document_id: impl ToString,
    description: impl Into<String>,
    changes: Vec<FieldChange>,
) -> Result<AuditLog> {
    log_audit(
        store,
        AuditEntry::new(action, EntityType::Document, document_id, description)
            .with_changes(changes),
    )
}

/// Field-level differences between two versions of a record
pub fn diff_changes<T: Serialize>(before: &T, after: &T) -> Vec<FieldChange> {
    let (Ok(Value::Object(old)), Ok(Value::Object(new))) =
        (serde_json::to_value(before), serde_json::to_value(after))
    else {
        return Vec::new();
    };

    let mut fields: Vec<&String> = old.keys().chain(new.keys()).collect();
    fields.sort();
    fields.dedup();

    fields
        .into_iter()
        .filter(|f| !DIFF_IGNORED.contains(&f.as_str()))
        .filter_map(|field| {
            let old_value = old.get(field);
            let new_value = new.get(field);
            (old_value != new_value).then(|| FieldChange {
                field: field.clone(),
                old_value: old_value.map(display_value),
                new_value: new_value.map(display_value),
            })
        })
        .collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Filters for listing audit entries
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub text: String,
    pub action: Option<AuditAction>,
    pub entity_type: Option<EntityType>,
    pub severity: Option<Severity>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Matching entries, newest first
pub fn search(store: &Store, query: &AuditQuery) -> Result<Vec<AuditLog>> {
    let mut logs: Vec<AuditLog> = store
        .get_all::<AuditLog>()?
        .into_iter()
        .filter(|l| l.matches(&query.text, query.action, query.entity_type, query.severity))
        .filter(|l| query.since.map_or(true, |s| l.timestamp >= s))
        .filter(|l| query.until.map_or(true, |u| l.timestamp <= u))
        .collect();

    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = query.limit {
        logs.truncate(limit);
    }
    Ok(logs)
}

/// Pretty JSON array of the given entries
pub fn export_json(logs: &[AuditLog]) -> Result<String> {
    serde_json::to_string_pretty(logs).context("Failed to serialize audit logs")
}
