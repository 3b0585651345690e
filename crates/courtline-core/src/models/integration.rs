//! External case-management system connections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Mutable, Record};
use crate::storage::Collection;

string_enum! {
    pub enum IntegrationType {
        Dex => ("dex", "DEX (Data Exchange)"),
        Cpcms => ("cpcms", "CPCMS (Case Management)"),
        AccessDb => ("access_db", "Microsoft Access Database"),
    }
}

string_enum! {
    pub enum ConnectionStatus {
        Connected => ("connected", "Connected"),
        Disconnected => ("disconnected", "Disconnected"),
        Error => ("error", "Error"),
    }
}

string_enum! {
    /// Kind of integration run
    pub enum IntegrationAction {
        Sync => ("sync", "Sync"),
        Import => ("import", "Import"),
        Export => ("export", "Export"),
        Test => ("test", "Connection Test"),
    }
}

string_enum! {
    pub enum RunStatus {
        Success => ("success", "Success"),
        Failure => ("failure", "Failure"),
    }
}

/// Maps one source field onto a target field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source_field: String,
    pub target_field: String,
    pub data_type: String,
    pub required: bool,
    /// One of uppercase, lowercase, trim, date, number, boolean
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<String>,
}

impl FieldMapping {
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: target_field.into(),
            data_type: "string".to_string(),
            required: false,
            transformation: None,
        }
    }

    pub fn with_transformation(mut self, transformation: impl Into<String>) -> Self {
        self.transformation = Some(transformation.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConfig {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub integration_type: IntegrationType,
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Minutes between automatic syncs
    pub sync_interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    pub auto_sync: bool,
    pub sync_cases: bool,
    pub sync_participants: bool,
    pub sync_documents: bool,
    pub sync_hearings: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_mappings: Option<Vec<FieldMapping>>,
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationConfig {
    /// A disabled, disconnected integration syncing every hour
    pub fn new(integration_type: IntegrationType, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            integration_type,
            name: name.into(),
            enabled: false,
            endpoint: None,
            api_key: None,
            username: None,
            sync_interval: 60,
            last_sync: None,
            auto_sync: false,
            sync_cases: true,
            sync_participants: true,
            sync_documents: false,
            sync_hearings: true,
            field_mappings: None,
            status: ConnectionStatus::Disconnected,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Both an endpoint and an API key are configured
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.endpoint) && present(&self.api_key)
    }

    /// Which data sets this integration syncs
    pub fn scopes(&self) -> Vec<&'static str> {
        [
            (self.sync_cases, "cases"),
            (self.sync_participants, "participants"),
            (self.sync_documents, "documents"),
            (self.sync_hearings, "hearings"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

impl Record for IntegrationConfig {
    const COLLECTION: Collection = Collection::Integrations;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for IntegrationConfig {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Result of one integration run. Stored newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub integration_type: IntegrationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<Uuid>,
    pub action: IntegrationAction,
    pub status: RunStatus,
    pub records_processed: u32,
    pub message: String,
}

impl IntegrationLog {
    pub fn new(
        integration: &IntegrationConfig,
        action: IntegrationAction,
        status: RunStatus,
        records_processed: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            integration_type: integration.integration_type,
            integration_id: Some(integration.id),
            action,
            status,
            records_processed,
            message: message.into(),
        }
    }
}

impl Record for IntegrationLog {
    const COLLECTION: Collection = Collection::IntegrationLogs;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.timestamp = now;
    }
}
