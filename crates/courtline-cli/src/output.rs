//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable tables and detail views (default)
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag), printing only ids

use serde::Serialize;
use serde_json::Value;

use courtline_core::models::{
    AuditLog, Case, Contact, DataRetentionPolicy, Document, IncomingMessage, IntegrationConfig,
    IntegrationLog, Message, MessageHistory, MessageTemplate, Participant, PhoneNumber, User,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// A record that can be shown as a table row
pub trait Tabular: Serialize {
    /// Plural noun used in list footers
    const NOUN: &'static str;
    const HEADERS: &'static [&'static str];

    /// Identifier printed in quiet mode
    fn key(&self) -> String;

    fn row(&self) -> Vec<String>;
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    /// Skip confirmation prompts
    pub assume_yes: bool,
}

impl Output {
    pub fn new(format: OutputFormat, assume_yes: bool) -> Self {
        Self { format, assume_yes }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single record as `field: value` lines
    pub fn print_record<T: Tabular>(&self, record: &T) {
        match self.format {
            OutputFormat::Human => print_details(&to_value(record)),
            OutputFormat::Json => print_json(record),
            OutputFormat::Quiet => println!("{}", record.key()),
        }
    }

    /// Print a list of records as a table
    pub fn print_records<T: Tabular>(&self, records: &[T]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No {} found.", T::NOUN);
                    return;
                }
                let rows: Vec<Vec<String>> = records.iter().map(Tabular::row).collect();
                print_table(T::HEADERS, &rows);
                println!("\n{} {}", records.len(), T::NOUN);
            }
            OutputFormat::Json => print_json(&records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.key());
                }
            }
        }
    }

    /// Print any serializable value; `human` renders the default view
    pub fn print_value<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) {
        match self.format {
            OutputFormat::Human => human(value),
            OutputFormat::Json => print_json(value),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human && !self.assume_yes
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// `key: value` lines for each non-null field of an object
fn print_details(value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", display_value(value));
        return;
    };
    let width = map.keys().map(|k| k.len()).max().unwrap_or(0);
    for (key, val) in map {
        if val.is_null() {
            continue;
        }
        println!("{:<width$}  {}", format!("{}:", key), display_value(val), width = width + 1);
    }
}

/// Render a JSON value on one line
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(|v| !v.is_object()) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(headers.iter().map(|h| h.to_string()).collect()));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in rows {
        println!("{}", line(row.clone()));
    }
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// First eight characters of an id
pub fn short_id(id: &impl ToString) -> String {
    id.to_string().chars().take(8).collect()
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

impl Tabular for Case {
    const NOUN: &'static str = "case(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "DOCKET", "TITLE", "TYPE", "STATUS", "PRIORITY", "NEXT HEARING"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.docket_number.clone(),
            truncate(&self.title, 30),
            self.case_type.label().to_string(),
            self.status.label().to_string(),
            self.priority.label().to_string(),
            self.next_hearing_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

impl Tabular for Contact {
    const NOUN: &'static str = "contact(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "RELATIONSHIP", "PHONE", "PREFERRED", "SMS CONSENT", "CASES"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.full_name(),
            self.relationship.label().to_string(),
            self.phone_number.clone(),
            self.preferred_contact.label().to_string(),
            if self.sms_consent { "yes" } else { "no" }.to_string(),
            self.linked_cases.len().to_string(),
        ]
    }
}

impl Tabular for Participant {
    const NOUN: &'static str = "participant(s)";
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "ROLE", "CASE", "PHONE", "LANGUAGE"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.full_name(),
            self.role.label().to_string(),
            short_id(&self.case_id),
            or_dash(&self.contact_phone),
            self.language_preference.clone(),
        ]
    }
}

impl Tabular for Document {
    const NOUN: &'static str = "document(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "TITLE", "TYPE", "DOCKET", "SIZE", "STATUS", "FLAGS"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        let flags: Vec<&str> = [
            (self.confidential, "confidential"),
            (self.hipaa_protected, "HIPAA"),
            (self.ferpa_protected, "FERPA"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
        vec![
            short_id(&self.id),
            truncate(&self.title, 30),
            self.doc_type.label().to_string(),
            self.docket_number.clone(),
            self.size_label(),
            self.status.label().to_string(),
            flags.join(","),
        ]
    }
}

impl Tabular for Message {
    const NOUN: &'static str = "message(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "RECIPIENT", "PHONE", "TYPE", "PRIORITY", "SCHEDULED", "STATUS", "SUBJECT"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.recipient_name.clone(),
            self.recipient_phone.clone(),
            self.message_type.label().to_string(),
            self.priority().label().to_string(),
            self.scheduled_for.format("%Y-%m-%d %H:%M").to_string(),
            self.status.label().to_string(),
            truncate(&self.subject, 30),
        ]
    }
}

impl Tabular for MessageHistory {
    const NOUN: &'static str = "history row(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "WHEN", "DIRECTION", "FROM", "TO", "STATUS", "SEGMENTS", "BODY"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.sent_at.format("%Y-%m-%d %H:%M").to_string(),
            self.direction.label().to_string(),
            self.from.clone(),
            self.to.clone(),
            self.status.label().to_string(),
            self.num_segments.to_string(),
            truncate(&self.body, 40),
        ]
    }
}

impl Tabular for IncomingMessage {
    const NOUN: &'static str = "inbox message(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "RECEIVED", "FROM", "STATUS", "PRIORITY", "TAGS", "BODY"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        let flag = if self.requires_response { "*" } else { "" };
        vec![
            format!("{}{}", short_id(&self.id), flag),
            self.received_at.format("%Y-%m-%d %H:%M").to_string(),
            self.from.clone(),
            self.status.label().to_string(),
            self.priority.label().to_string(),
            self.tags.join(","),
            truncate(&self.body, 40),
        ]
    }
}

impl Tabular for AuditLog {
    const NOUN: &'static str = "audit entr(ies)";
    const HEADERS: &'static [&'static str] =
        &["WHEN", "USER", "ACTION", "ENTITY", "SEVERITY", "DESCRIPTION"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.user_name.clone(),
            self.action.label().to_string(),
            format!("{} {}", self.entity_type, short_id(&self.entity_id)),
            self.severity.label().to_string(),
            truncate(&self.description, 50),
        ]
    }
}

impl Tabular for IntegrationConfig {
    const NOUN: &'static str = "integration(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "TYPE", "ENABLED", "STATUS", "LAST SYNC", "SCOPES"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.name.clone(),
            self.integration_type.as_str().to_string(),
            if self.enabled { "yes" } else { "no" }.to_string(),
            self.status.label().to_string(),
            self.last_sync
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
            self.scopes().join(","),
        ]
    }
}

impl Tabular for IntegrationLog {
    const NOUN: &'static str = "run(s)";
    const HEADERS: &'static [&'static str] =
        &["WHEN", "TYPE", "ACTION", "STATUS", "RECORDS", "MESSAGE"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.integration_type.as_str().to_string(),
            self.action.label().to_string(),
            self.status.label().to_string(),
            self.records_processed.to_string(),
            truncate(&self.message, 50),
        ]
    }
}

impl Tabular for PhoneNumber {
    const NOUN: &'static str = "number(s)";
    const HEADERS: &'static [&'static str] = &["ID", "NUMBER", "NAME", "TYPE", "ACTIVE", "PRIMARY"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.phone_number.clone(),
            self.friendly_name.clone(),
            self.number_type.label().to_string(),
            if self.active { "yes" } else { "no" }.to_string(),
            if self.is_primary { "★" } else { "" }.to_string(),
        ]
    }
}

impl Tabular for MessageTemplate {
    const NOUN: &'static str = "template(s)";
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "CATEGORY", "ACTIVE", "USED", "VARIABLES"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.name.clone(),
            self.category.clone(),
            if self.active { "yes" } else { "no" }.to_string(),
            self.usage_count.to_string(),
            self.variables.join(","),
        ]
    }
}

impl Tabular for User {
    const NOUN: &'static str = "user(s)";
    const HEADERS: &'static [&'static str] = &["ID", "USERNAME", "NAME", "EMAIL", "ROLE", "ACTIVE"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.username.clone(),
            self.full_name(),
            self.email.clone(),
            self.role.label().to_string(),
            if self.active { "yes" } else { "no" }.to_string(),
        ]
    }
}

impl Tabular for DataRetentionPolicy {
    const NOUN: &'static str = "polic(ies)";
    const HEADERS: &'static [&'static str] = &["ID", "ENTITY", "DAYS", "AUTO DELETE", "ARCHIVE"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            short_id(&self.id),
            self.entity_type.clone(),
            self.retention_period_days.to_string(),
            if self.auto_delete { "yes" } else { "no" }.to_string(),
            if self.archive_before_delete { "yes" } else { "no" }.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courtline_core::models::{CaseType, MessageType};
    use serde_json::json;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_should_prompt() {
        assert!(Output::new(OutputFormat::Human, false).should_prompt());
        assert!(!Output::new(OutputFormat::Human, true).should_prompt());
        assert!(!Output::new(OutputFormat::Json, false).should_prompt());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("text")), "text");
        assert_eq!(display_value(&json!(["a", "b"])), "a, b");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!([{"k": 1}])), r#"[{"k":1}]"#);
    }

    #[test]
    fn test_case_row() {
        let case = Case::new("JV-2024-001", "In re Smith", CaseType::Abuse);
        let row = case.row();
        assert_eq!(row.len(), Case::HEADERS.len());
        assert_eq!(row[0].len(), 8);
        assert_eq!(row[3], "Abuse/Neglect");
        assert_eq!(row[6], "-");
    }

    #[test]
    fn test_message_row_shows_priority() {
        let message = Message::new(
            "c1",
            "Maria Lopez",
            "+15551234567",
            MessageType::Emergency,
            "Closure",
            "Court is closed today",
            Utc::now(),
        );
        let row = message.row();
        assert_eq!(row.len(), Message::HEADERS.len());
        assert_eq!(row[4], "Urgent");
    }
}
