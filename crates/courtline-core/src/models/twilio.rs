//! SMS provider settings, phone numbers and message templates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Mutable, Record, Setting};
use crate::storage::Collection;

/// Provider account settings. Singleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TwilioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_service_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_callback_url: Option<String>,
    pub max_retries: u32,
    /// Seconds between retries
    pub retry_delay: u32,
    pub enable_delivery_reports: bool,
    pub enable_error_notifications: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            messaging_service_sid: None,
            status_callback_url: None,
            max_retries: 3,
            retry_delay: 5,
            enable_delivery_reports: true,
            enable_error_notifications: true,
            updated_at: None,
        }
    }
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some()
    }

    /// Auth token with all but the last four characters hidden
    pub fn masked_token(&self) -> Option<String> {
        self.auth_token.as_deref().map(|t| {
            let chars: Vec<char> = t.chars().collect();
            let keep = chars.len().min(4);
            let hidden = "*".repeat(chars.len() - keep);
            let tail: String = chars[chars.len() - keep..].iter().collect();
            format!("{}{}", hidden, tail)
        })
    }
}

impl Setting for TwilioConfig {
    const COLLECTION: Collection = Collection::TwilioConfig;

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

string_enum! {
    pub enum PhoneNumberType {
        Local => ("local", "Local Number"),
        Tollfree => ("tollfree", "Toll-Free Number"),
        Shortcode => ("shortcode", "Short Code"),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub sms: bool,
    pub mms: bool,
    pub voice: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            sms: true,
            mms: false,
            voice: false,
        }
    }
}

/// A provider phone number in the sending pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    pub id: Uuid,
    pub phone_number: String,
    pub friendly_name: String,
    #[serde(rename = "type")]
    pub number_type: PhoneNumberType,
    #[serde(default)]
    pub capabilities: Capabilities,
    pub active: bool,
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_messages_limit: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhoneNumber {
    pub fn new(phone_number: impl Into<String>, friendly_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phone_number: phone_number.into(),
            friendly_name: friendly_name.into(),
            number_type: PhoneNumberType::Local,
            capabilities: Capabilities::default(),
            active: true,
            is_primary: false,
            assigned_to: None,
            monthly_messages_limit: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for PhoneNumber {
    const COLLECTION: Collection = Collection::PhoneNumbers;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for PhoneNumber {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// A reusable message body with `{{variable}}` placeholders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    pub language: String,
    pub active: bool,
    pub usage_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageTemplate {
    /// An active English template. `variables` is derived from the body.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let body = body.into();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            subject: subject.into(),
            variables: crate::messaging::extract_variables_from_template(&body),
            body,
            language: "en".to_string(),
            active: true,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Templates installed when none exist yet
    pub fn defaults() -> Vec<MessageTemplate> {
        vec![
            MessageTemplate::new(
                "Hearing Reminder",
                "hearing_reminder",
                "Upcoming Hearing",
                "Hello {{name}}, this is a reminder about your dependency hearing on {{date}} at {{time}}. Location: {{location}}. Case #{{caseNumber}}.",
            ),
            MessageTemplate::new(
                "Document Request",
                "document_request",
                "Documents Needed",
                "Hi {{name}}, we need you to submit {{documentType}} for case #{{caseNumber}} by {{deadline}}. Please contact us if you have questions.",
            ),
        ]
    }
}

impl Record for MessageTemplate {
    const COLLECTION: Collection = Collection::MessageTemplates;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for MessageTemplate {
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

    #[test]
    fn test_twilio_defaults() {
        let config = TwilioConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, 5);
        assert!(!config.is_configured());
        assert!(config.masked_token().is_none());
    }

    #[test]
    fn test_masked_token() {
        let config = TwilioConfig {
            auth_token: Some("abcdef123456".to_string()),
            ..Default::default()
        };
        assert_eq!(config.masked_token().as_deref(), Some("********3456"));

        let short = TwilioConfig {
            auth_token: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(short.masked_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_default_templates_extract_variables() {
        let templates = MessageTemplate::defaults();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].name, "Hearing Reminder");
        assert_eq!(
            templates[0].variables,
            vec!["name", "date", "time", "location", "caseNumber"]
        );
        assert_eq!(
            templates[1].variables,
            vec!["name", "documentType", "caseNumber", "deadline"]
        );
    }

    #[test]
    fn test_phone_number_serialization() {
        let number = PhoneNumber::new("+15550001111", "Main line");
        let json = serde_json::to_value(&number).unwrap();
        assert_eq!(json["type"], "local");
        assert_eq!(json["capabilities"]["sms"], true);
        assert_eq!(json["isPrimary"], false);
    }
}
