//! Named collections
//!
//! Every entity type lives under one storage key. The key strings are the
//! on-disk layout and must not change.

use std::fmt;
use std::str::FromStr;

/// A named collection in the key/value store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Cases,
    Contacts,
    Participants,
    Messages,
    MessageHistory,
    IncomingMessages,
    Documents,
    AuditLogs,
    Users,
    Integrations,
    IntegrationLogs,
    TwilioConfig,
    PhoneNumbers,
    MessageTemplates,
    ComplianceSettings,
    DataRetentionPolicies,
}

impl Collection {
    /// Every collection, in display order
    pub const ALL: [Collection; 16] = [
        Collection::Cases,
        Collection::Contacts,
        Collection::Participants,
        Collection::Messages,
        Collection::MessageHistory,
        Collection::IncomingMessages,
        Collection::Documents,
        Collection::AuditLogs,
        Collection::Users,
        Collection::Integrations,
        Collection::IntegrationLogs,
        Collection::TwilioConfig,
        Collection::PhoneNumbers,
        Collection::MessageTemplates,
        Collection::ComplianceSettings,
        Collection::DataRetentionPolicies,
    ];

    /// The storage key
    pub fn key(self) -> &'static str {
        match self {
            Collection::Cases => "dh_cases",
            Collection::Contacts => "dh_contacts",
            Collection::Participants => "dh_participants",
            Collection::Messages => "dh_messages",
            Collection::MessageHistory => "dh_message_history",
            Collection::IncomingMessages => "dh_incoming_messages",
            Collection::Documents => "dh_documents",
            Collection::AuditLogs => "dh_audit_logs",
            Collection::Users => "dh_users",
            Collection::Integrations => "dh_integrations",
            Collection::IntegrationLogs => "dh_integration_logs",
            Collection::TwilioConfig => "dh_twilio_config",
            Collection::PhoneNumbers => "dh_phone_numbers",
            Collection::MessageTemplates => "dh_message_templates",
            Collection::ComplianceSettings => "dh_compliance_settings",
            Collection::DataRetentionPolicies => "dh_data_retention_policies",
        }
    }

    /// Singleton collections hold one JSON object instead of an array
    pub fn is_singleton(self) -> bool {
        matches!(self, Collection::TwilioConfig | Collection::ComplianceSettings)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Collection {
    type Err = String;

    /// Accepts the full key (`dh_cases`) or the bare name (`cases`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Collection::ALL
            .into_iter()
            .find(|c| c.key() == wanted || c.key().trim_start_matches("dh_") == wanted)
            .ok_or_else(|| format!("Unknown collection: '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<_> = Collection::ALL.iter().map(|c| c.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), Collection::ALL.len());
    }

    #[test]
    fn test_parse_collection() {
        assert_eq!("dh_cases".parse::<Collection>(), Ok(Collection::Cases));
        assert_eq!("audit_logs".parse::<Collection>(), Ok(Collection::AuditLogs));
        assert!("links".parse::<Collection>().is_err());
    }

    #[test]
    fn test_singletons() {
        assert!(Collection::ComplianceSettings.is_singleton());
        assert!(!Collection::Cases.is_singleton());
    }
}
