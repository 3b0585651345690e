//! Input validation
//!
//! Pattern validators for individual values, plus a [`Validate`] impl per
//! entity that reports every field error at once. Nothing here touches
//! storage; callers validate before they write.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::models::{
    Case, ComplianceSettings, Contact, DataRetentionPolicy, Document, IntegrationConfig, Message,
    MessageTemplate, Participant, PhoneNumber, TwilioConfig, User,
};

/// Longest SMS body accepted by forms
pub const MAX_BODY_CHARS: usize = 1600;

/// Widest reminder window accepted by forms, one year in hours
pub const MAX_SEND_BEFORE_HOURS: u32 = 8760;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{10,15}$").expect("phone regex is valid"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));
static DOCKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9-]+$").expect("docket regex is valid"));
static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip regex is valid"));

/// Phone number check; formatting characters are ignored
pub fn is_valid_phone_number(phone: &str) -> bool {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    PHONE_RE.is_match(&digits)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// At least four letters, digits or dashes
pub fn is_valid_docket_number(docket: &str) -> bool {
    docket.chars().count() >= 4 && DOCKET_RE.is_match(docket)
}

pub fn is_valid_zip_code(zip: &str) -> bool {
    ZIP_RE.is_match(zip)
}

/// Absolute URL with a scheme and host
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|u| u.has_host())
}

/// Parse RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD`.
/// Values without an offset are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn is_valid_date(value: &str) -> bool {
    parse_datetime(value).is_some()
}

/// Strictly after `now`; unparseable values are not in the future
pub fn is_future_date(value: &str, now: DateTime<Utc>) -> bool {
    parse_datetime(value).is_some_and(|d| d > now)
}

/// Strictly before `now`
pub fn is_past_date(value: &str, now: DateTime<Utc>) -> bool {
    parse_datetime(value).is_some_and(|d| d < now)
}

/// One invalid field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field error found in one record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", join(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Whether `field` has an error
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Form-level validation for an entity
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Accumulates field errors
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.fail(field, message);
        }
        self
    }

    fn required(&mut self, value: &str, field: &str, message: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, message)
    }

    fn min_len(&mut self, value: &str, min: usize, field: &str, message: &str) -> &mut Self {
        self.check(value.chars().count() >= min, field, message)
    }

    /// Optional values pass when absent or empty
    fn optional(
        &mut self,
        value: Option<&str>,
        valid: fn(&str) -> bool,
        field: &str,
        message: &str,
    ) -> &mut Self {
        let ok = match value {
            Some(v) if !v.is_empty() => valid(v),
            _ => true,
        };
        self.check(ok, field, message)
    }

    fn body(&mut self, body: &str) -> &mut Self {
        let len = body.chars().count();
        if len == 0 {
            self.fail("body", "Message body is required");
        } else if len > MAX_BODY_CHARS {
            self.fail("body", "Message is too long");
        }
        self
    }

    fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: std::mem::take(&mut self.errors),
            })
        }
    }
}

fn matches_phone_pattern(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

impl Validate for Case {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.docket_number, "docketNumber", "Docket number is required")
            .required(&self.title, "title", "Case title is required")
            .finish()
    }
}

impl Validate for Contact {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.first_name, "firstName", "First name is required")
            .required(&self.last_name, "lastName", "Last name is required")
            .check(
                matches_phone_pattern(&self.phone_number),
                "phoneNumber",
                "Invalid phone number format",
            )
            .optional(
                self.alternate_phone.as_deref(),
                matches_phone_pattern,
                "alternatePhone",
                "Invalid phone number format",
            )
            .optional(self.email.as_deref(), is_valid_email, "email", "Invalid email format")
            .required(&self.language, "language", "Language is required")
            .finish()
    }
}

impl Validate for Participant {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.first_name, "firstName", "First name is required")
            .required(&self.last_name, "lastName", "Last name is required")
            .required(&self.case_id, "caseId", "Case is required")
            .optional(
                self.contact_email.as_deref(),
                is_valid_email,
                "contactEmail",
                "Invalid email format",
            )
            .required(
                &self.language_preference,
                "languagePreference",
                "Language preference is required",
            )
            .finish()
    }
}

impl Validate for Message {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.recipient_id, "recipientId", "Recipient is required")
            .required(&self.subject, "subject", "Subject is required")
            .body(&self.body)
            .check(
                self.send_before.map_or(true, |h| h <= MAX_SEND_BEFORE_HOURS),
                "sendBefore",
                "Send-before window cannot exceed 8760 hours",
            )
            .finish()
    }
}

impl Validate for Document {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.case_id, "caseId", "Case is required")
            .required(&self.title, "title", "Title is required")
            .required(&self.file_name, "fileName", "File name is required")
            .check(self.file_size > 0, "fileSize", "File size must be positive")
            .required(&self.uploaded_by, "uploadedBy", "Uploaded by is required")
            .finish()
    }
}

impl Validate for IntegrationConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.name, "name", "Integration name is required")
            .optional(self.endpoint.as_deref(), is_valid_url, "endpoint", "Invalid endpoint URL")
            .check(
                self.sync_interval >= 5,
                "syncInterval",
                "Sync interval must be at least 5 minutes",
            )
            .finish()
    }
}

impl Validate for TwilioConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(
                self.account_sid.as_deref().unwrap_or_default(),
                "accountSid",
                "Account SID is required",
            )
            .required(
                self.auth_token.as_deref().unwrap_or_default(),
                "authToken",
                "Auth Token is required",
            )
            .optional(
                self.status_callback_url.as_deref(),
                is_valid_url,
                "statusCallbackUrl",
                "Invalid callback URL",
            )
            .check(self.max_retries <= 5, "maxRetries", "Must be between 0 and 5")
            .check(
                (1..=60).contains(&self.retry_delay),
                "retryDelay",
                "Must be between 1 and 60 seconds",
            )
            .finish()
    }
}

impl Validate for PhoneNumber {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .check(
                matches_phone_pattern(&self.phone_number),
                "phoneNumber",
                "Invalid phone number format",
            )
            .required(&self.friendly_name, "friendlyName", "Friendly name is required")
            .finish()
    }
}

impl Validate for MessageTemplate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.name, "name", "Template name is required")
            .required(&self.category, "category", "Category is required")
            .required(&self.subject, "subject", "Subject is required")
            .body(&self.body)
            .required(&self.language, "language", "Language is required")
            .finish()
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .min_len(
                &self.username,
                3,
                "username",
                "Username must be at least 3 characters",
            )
            .check(is_valid_email(&self.email), "email", "Invalid email format")
            .required(&self.first_name, "firstName", "First name is required")
            .required(&self.last_name, "lastName", "Last name is required")
            .finish()
    }
}

impl Validate for ComplianceSettings {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .check(
                self.data_retention_days >= 30,
                "dataRetentionDays",
                "Minimum 30 days retention required",
            )
            .check(
                self.audit_log_retention_days >= 365,
                "auditLogRetentionDays",
                "Minimum 1 year audit log retention required",
            )
            .optional(
                self.privacy_policy_url.as_deref(),
                is_valid_url,
                "privacyPolicyUrl",
                "Invalid URL",
            )
            .optional(
                self.terms_of_service_url.as_deref(),
                is_valid_url,
                "termsOfServiceUrl",
                "Invalid URL",
            )
            .finish()
    }
}

impl Validate for DataRetentionPolicy {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Checker::default()
            .required(&self.entity_type, "entityType", "Entity type is required")
            .check(
                self.retention_period_days >= 1,
                "retentionPeriodDays",
                "Retention period must be at least 1 day",
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseType, IntegrationType, MessageType, Relationship, UserRole};
    use chrono::Duration;

    #[test]
    fn test_phone_numbers() {
        assert!(is_valid_phone_number("+15551234567"));
        assert!(is_valid_phone_number("(555) 123-4567"));
        assert!(is_valid_phone_number("5551234567"));
        assert!(!is_valid_phone_number("abc"));
        assert!(!is_valid_phone_number("555-1234"));
    }

    #[test]
    fn test_email_zip_docket() {
        assert!(is_valid_email("clerk@court.gov"));
        assert!(!is_valid_email("clerk@court"));
        assert!(!is_valid_email("a b@c.d"));

        assert!(is_valid_zip_code("19107"));
        assert!(is_valid_zip_code("19107-1234"));
        assert!(!is_valid_zip_code("1910"));

        assert!(is_valid_docket_number("JV-2024-001"));
        assert!(is_valid_docket_number("jv-1"));
        assert!(!is_valid_docket_number("JV1"));
        assert!(!is_valid_docket_number("JV 2024"));
    }

    #[test]
    fn test_urls() {
        assert!(is_valid_url("https://dex.example.gov/api"));
        assert!(!is_valid_url("dex.example.gov"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("2025-03-01T09:30:00Z").is_some());
        assert!(parse_datetime("2025-03-01T09:30:00-05:00").is_some());
        assert!(parse_datetime("2025-03-01T09:30").is_some());
        assert!(parse_datetime("2025-03-01 09:30").is_some());
        assert_eq!(
            parse_datetime("2025-03-01").unwrap().to_rfc3339(),
            "2025-03-01T00:00:00+00:00"
        );
        assert!(!is_valid_date("March 1st"));
    }

    #[test]
    fn test_future_and_past() {
        let now = Utc::now();
        let tomorrow = (now + Duration::days(1)).to_rfc3339();
        let yesterday = (now - Duration::days(1)).to_rfc3339();

        assert!(is_future_date(&tomorrow, now));
        assert!(!is_future_date(&yesterday, now));
        assert!(is_past_date(&yesterday, now));
        assert!(!is_past_date("garbage", now));
    }

    #[test]
    fn test_contact_reports_all_errors() {
        let mut contact = Contact::new("", "Lopez", Relationship::Mother, "555-123-4567");
        contact.email = Some("nope".to_string());
        contact.alternate_phone = Some(String::new());

        let errors = contact.validate().unwrap_err();
        assert!(errors.has("firstName"));
        assert!(errors.has("phoneNumber"));
        assert!(errors.has("email"));
        assert!(!errors.has("alternatePhone"));
        assert_eq!(errors.errors.len(), 3);
        assert!(errors.to_string().contains("firstName: First name is required"));
    }

    #[test]
    fn test_valid_contact() {
        let mut contact = Contact::new("Maria", "Lopez", Relationship::Mother, "+15551234567");
        assert!(contact.validate().is_ok());

        // ZIP codes are stored as entered
        contact.zip_code = Some("K1A 0B1".to_string());
        assert!(contact.validate().is_ok());
    }

    #[test]
    fn test_case_requires_docket_and_title() {
        let case = Case::new(" ", "", CaseType::Dependency);
        let errors = case.validate().unwrap_err();
        assert!(errors.has("docketNumber"));
        assert!(errors.has("title"));
    }

    #[test]
    fn test_message_body_limits() {
        let mut msg = Message::new(
            "c1",
            "Maria",
            "+15551234567",
            MessageType::General,
            "Notice",
            "",
            Utc::now(),
        );
        assert!(msg.validate().unwrap_err().has("body"));

        msg.body = "x".repeat(MAX_BODY_CHARS);
        assert!(msg.validate().is_ok());

        msg.body.push('x');
        assert!(msg.validate().unwrap_err().has("body"));
    }

    #[test]
    fn test_message_send_before_bound() {
        let mut msg = Message::new(
            "c1",
            "Maria",
            "+15551234567",
            MessageType::HearingReminder,
            "Hearing",
            "Your hearing is tomorrow",
            Utc::now(),
        );
        msg.send_before = Some(MAX_SEND_BEFORE_HOURS);
        assert!(msg.validate().is_ok());

        msg.send_before = Some(u32::MAX);
        let errors = msg.validate().unwrap_err();
        assert!(errors.has("sendBefore"));
        assert_eq!(errors.errors.len(), 1);
    }

    #[test]
    fn test_integration_bounds() {
        let mut config = IntegrationConfig::new(IntegrationType::Dex, "DEX");
        config.sync_interval = 4;
        config.endpoint = Some("ftp-less".to_string());
        let errors = config.validate().unwrap_err();
        assert!(errors.has("syncInterval"));
        assert!(errors.has("endpoint"));

        config.sync_interval = 5;
        config.endpoint = Some(String::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_twilio_bounds() {
        let config = TwilioConfig {
            max_retries: 6,
            retry_delay: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.has("accountSid"));
        assert!(errors.has("authToken"));
        assert!(errors.has("maxRetries"));
        assert!(errors.has("retryDelay"));

        let config = TwilioConfig {
            account_sid: Some("AC123".to_string()),
            auth_token: Some("token".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compliance_minimums() {
        let settings = ComplianceSettings {
            data_retention_days: 29,
            audit_log_retention_days: 364,
            privacy_policy_url: Some("privacy".to_string()),
            ..Default::default()
        };
        let errors = settings.validate().unwrap_err();
        assert_eq!(errors.errors.len(), 3);
        assert!(ComplianceSettings::default().validate().is_ok());
    }

    #[test]
    fn test_user_and_policy() {
        let user = User::new("jo", "jo@court", "Jo", "", UserRole::Clerk);
        let errors = user.validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(errors.has("lastName"));

        let policy = DataRetentionPolicy::new("message", 0);
        assert!(policy.validate().unwrap_err().has("retentionPeriodDays"));
    }
}
