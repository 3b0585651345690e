//! Compliance settings and data-retention policies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Mutable, Record, Setting};
use crate::storage::Collection;

/// Seven years, in days
pub const DEFAULT_RETENTION_DAYS: u32 = 2555;

/// Organisation-wide compliance switches. Singleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSettings {
    pub hipaa_enabled: bool,
    pub ferpa_enabled: bool,
    pub encryption_enabled: bool,
    pub data_retention_days: u32,
    pub auto_delete_expired: bool,
    pub audit_log_retention_days: u32,
    /// Outbound SMS requires the recipient's recorded consent
    pub require_consent_for_sms: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            hipaa_enabled: true,
            ferpa_enabled: true,
            encryption_enabled: true,
            data_retention_days: DEFAULT_RETENTION_DAYS,
            auto_delete_expired: false,
            audit_log_retention_days: DEFAULT_RETENTION_DAYS,
            require_consent_for_sms: true,
            privacy_policy_url: None,
            terms_of_service_url: None,
            updated_at: None,
        }
    }
}

impl Setting for ComplianceSettings {
    const COLLECTION: Collection = Collection::ComplianceSettings;

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

/// How long records of one kind are kept. Configuration only; nothing is
/// deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataRetentionPolicy {
    pub id: Uuid,
    pub entity_type: String,
    pub retention_period_days: u32,
    pub auto_delete: bool,
    pub archive_before_delete: bool,
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_execution: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataRetentionPolicy {
    pub fn new(entity_type: impl Into<String>, retention_period_days: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entity_type: entity_type.into(),
            retention_period_days,
            auto_delete: false,
            archive_before_delete: true,
            exceptions: Vec::new(),
            last_executed: None,
            next_execution: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a record created at `created_at` has outlived this policy
    pub fn is_past_retention(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - created_at > chrono::Duration::days(self.retention_period_days as i64)
    }
}

impl Record for DataRetentionPolicy {
    const COLLECTION: Collection = Collection::DataRetentionPolicies;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for DataRetentionPolicy {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_compliance_defaults() {
        let settings = ComplianceSettings::default();
        assert!(settings.hipaa_enabled);
        assert!(settings.ferpa_enabled);
        assert!(settings.encryption_enabled);
        assert!(settings.require_consent_for_sms);
        assert!(!settings.auto_delete_expired);
        assert_eq!(settings.data_retention_days, 2555);
        assert_eq!(settings.audit_log_retention_days, 2555);
    }

    #[test]
    fn test_compliance_deserializes_partial() {
        let json = r#"{
            "hipaaEnabled": false, "ferpaEnabled": true, "encryptionEnabled": true,
            "dataRetentionDays": 90, "autoDeleteExpired": true,
            "auditLogRetentionDays": 400, "requireConsentForSms": false
        }"#;
        let settings: ComplianceSettings = serde_json::from_str(json).unwrap();
        assert!(!settings.hipaa_enabled);
        assert_eq!(settings.data_retention_days, 90);
        assert!(settings.updated_at.is_none());
    }

    #[test]
    fn test_retention_window() {
        let policy = DataRetentionPolicy::new("message", 30);
        let now = Utc::now();
        assert!(!policy.is_past_retention(now - Duration::days(29), now));
        assert!(policy.is_past_retention(now - Duration::days(31), now));
    }
}
