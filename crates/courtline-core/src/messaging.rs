//! SMS message helpers
//!
//! Template rendering, segment estimates and reminder timing. All functions
//! are pure; the outbox drives them against stored messages.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::{Captures, Regex};

use crate::models::{Case, Contact, MessageType, Priority};

/// Segment ceiling accepted by [`validate_message_length`] by default
pub const DEFAULT_MAX_SEGMENTS: u32 = 10;

const GSM_SEGMENT_LEN: usize = 160;
const UNICODE_SEGMENT_LEN: usize = 70;

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("variable regex is valid"));

/// Replace every `{{key}}` in one pass. Unknown placeholders are left as
/// they are and substituted values are never expanded again.
pub fn generate_message_body(template: &str, variables: &HashMap<String, String>) -> String {
    VARIABLE_RE
        .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholder names in first-seen order, without duplicates
pub fn extract_variables_from_template(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in VARIABLE_RE.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Estimated number of SMS segments
///
/// Length is counted in UTF-16 code units. Pure ASCII splits every 160
/// units; any other character drops that to 70.
pub fn calculate_message_segments(message: &str) -> u32 {
    let len = message.encode_utf16().count();
    let per_segment = if message.is_ascii() {
        GSM_SEGMENT_LEN
    } else {
        UNICODE_SEGMENT_LEN
    };
    len.div_ceil(per_segment) as u32
}

pub fn validate_message_length(message: &str, max_segments: u32) -> bool {
    calculate_message_segments(message) <= max_segments
}

/// Whether `now` falls inside the reminder window
/// `[scheduled_for - hours, scheduled_for)`. No window means no reminder.
/// A window reaching past the earliest representable time is open from the
/// start.
pub fn should_send_reminder(
    scheduled_for: DateTime<Utc>,
    send_before_hours: Option<u32>,
    now: DateTime<Utc>,
) -> bool {
    let Some(hours) = send_before_hours.filter(|h| *h > 0) else {
        return false;
    };
    let opened = scheduled_for
        .checked_sub_signed(Duration::hours(i64::from(hours)))
        .map_or(true, |window_start| now >= window_start);
    opened && now < scheduled_for
}

pub fn get_message_priority(message_type: MessageType) -> Priority {
    match message_type {
        MessageType::Emergency => Priority::Urgent,
        MessageType::HearingReminder => Priority::High,
        MessageType::DocumentRequest | MessageType::CaseUpdate => Priority::Medium,
        MessageType::General => Priority::Low,
    }
}

/// Standard template variables for a contact, filled from the case when given
pub fn template_variables(contact: &Contact, case: Option<&Case>) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), contact.full_name());
    vars.insert("firstName".to_string(), contact.first_name.clone());

    if let Some(case) = case {
        vars.insert("caseNumber".to_string(), case.docket_number.clone());
        vars.insert("caseTitle".to_string(), case.title.clone());
        if let Some(date) = case.next_hearing_date {
            vars.insert("date".to_string(), date.format("%B %-d, %Y").to_string());
        }
        let optional = [
            ("time", &case.next_hearing_time),
            ("location", &case.next_hearing_location),
            ("hearingType", &case.next_hearing_type),
            ("judge", &case.assigned_judge),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                vars.insert(key.to_string(), value.clone());
            }
        }
    }
    vars
}
