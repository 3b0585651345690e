//! Audit trail entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{contains_ci, Record};
use crate::storage::Collection;

string_enum! {
    pub enum AuditAction {
        Create => ("create", "Create"),
        Update => ("update", "Update"),
        Delete => ("delete", "Delete"),
        View => ("view", "View"),
        Export => ("export", "Export"),
        Send => ("send", "Send"),
        Login => ("login", "Login"),
        Logout => ("logout", "Logout"),
    }
}

string_enum! {
    /// Kind of entity an audit entry refers to
    pub enum EntityType {
        Case => ("case", "Case"),
        Contact => ("contact", "Contact"),
        Participant => ("participant", "Participant"),
        Message => ("message", "Message"),
        Document => ("document", "Document"),
        User => ("user", "User"),
        Setting => ("setting", "Setting"),
    }
}

string_enum! {
    pub enum Severity {
        Info => ("info", "Info"),
        Warning => ("warning", "Warning"),
        Error => ("error", "Error"),
        Critical => ("critical", "Critical"),
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

/// A single field changed by an update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

/// An append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_name: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<FieldChange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub severity: Severity,
    pub description: String,
}

impl AuditLog {
    /// Free-text search over user and description plus structured filters
    pub fn matches(
        &self,
        query: &str,
        action: Option<AuditAction>,
        entity_type: Option<EntityType>,
        severity: Option<Severity>,
    ) -> bool {
        if action.is_some_and(|a| a != self.action)
            || entity_type.is_some_and(|e| e != self.entity_type)
            || severity.is_some_and(|s| s != self.severity)
        {
            return false;
        }
        let q = query.trim().to_lowercase();
        q.is_empty()
            || contains_ci(&self.user_name, &q)
            || contains_ci(&self.description, &q)
            || contains_ci(&self.entity_id, &q)
    }
}

impl Record for AuditLog {
    const COLLECTION: Collection = Collection::AuditLogs;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.timestamp = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: "u1".to_string(),
            user_name: "Jane Clerk".to_string(),
            action: AuditAction::Update,
            entity_type: EntityType::Case,
            entity_id: "case-1".to_string(),
            changes: None,
            ip_address: None,
            user_agent: None,
            severity: Severity::Info,
            description: "Updated case JV-1".to_string(),
        }
    }

    #[test]
    fn test_audit_filters() {
        let log = entry();
        assert!(log.matches("jane", None, None, None));
        assert!(log.matches("jv-1", Some(AuditAction::Update), Some(EntityType::Case), None));
        assert!(!log.matches("", Some(AuditAction::Delete), None, None));
        assert!(!log.matches("", None, Some(EntityType::Contact), None));
        assert!(!log.matches("", None, None, Some(Severity::Critical)));
    }

    #[test]
    fn test_audit_serialization() {
        let mut log = entry();
        log.changes = Some(vec![FieldChange {
            field: "status".to_string(),
            old_value: Some("pending".to_string()),
            new_value: Some("active".to_string()),
        }]);

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["entityType"], "case");
        assert_eq!(json["changes"][0]["oldValue"], "pending");
        assert!(json.get("createdAt").is_none());
        assert!(json.get("ipAddress").is_none());
    }
}
