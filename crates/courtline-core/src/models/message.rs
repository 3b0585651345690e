//! Scheduled outbound messages and the SMS history log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{contains_ci, Mutable, Priority, Record};
use crate::messaging::{get_message_priority, should_send_reminder};
use crate::storage::Collection;

string_enum! {
    pub enum MessageType {
        HearingReminder => ("hearing_reminder", "Hearing Reminder"),
        CaseUpdate => ("case_update", "Case Update"),
        DocumentRequest => ("document_request", "Document Request"),
        General => ("general", "General Notice"),
        Emergency => ("emergency", "Emergency"),
    }
}

string_enum! {
    /// Lifecycle of a scheduled message
    pub enum MessageStatus {
        Scheduled => ("scheduled", "Scheduled"),
        Sent => ("sent", "Sent"),
        Delivered => ("delivered", "Delivered"),
        Failed => ("failed", "Failed"),
        Cancelled => ("cancelled", "Cancelled"),
    }
}

string_enum! {
    pub enum Direction {
        Outbound => ("outbound", "Outbound"),
        Inbound => ("inbound", "Inbound"),
    }
}

string_enum! {
    /// Provider-reported status of a history entry
    pub enum DeliveryStatus {
        Sent => ("sent", "Sent"),
        Delivered => ("delivered", "Delivered"),
        Failed => ("failed", "Failed"),
        Received => ("received", "Received"),
        Undelivered => ("undelivered", "Undelivered"),
    }
}

/// An SMS scheduled for a contact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    /// Contact id
    pub recipient_id: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docket_number: Option<String>,
    pub message_type: MessageType,
    pub subject: String,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
    /// Reminder window in hours before `scheduled_for`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_before: Option<u32>,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        recipient_id: impl Into<String>,
        recipient_name: impl Into<String>,
        recipient_phone: impl Into<String>,
        message_type: MessageType,
        subject: impl Into<String>,
        body: impl Into<String>,
        scheduled_for: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recipient_id: recipient_id.into(),
            recipient_name: recipient_name.into(),
            recipient_phone: recipient_phone.into(),
            case_id: None,
            docket_number: None,
            message_type,
            subject: subject.into(),
            body: body.into(),
            scheduled_for,
            send_before: None,
            status: MessageStatus::Scheduled,
            sent_at: None,
            delivered_at: None,
            twilio_sid: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Still waiting to be sent
    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Scheduled
    }

    /// Scheduled and either past its send time or inside its reminder window
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.scheduled_for <= now || should_send_reminder(self.scheduled_for, self.send_before, now)
    }

    pub fn priority(&self) -> Priority {
        get_message_priority(self.message_type)
    }

    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || contains_ci(&self.recipient_name, &q)
            || contains_ci(&self.subject, &q)
            || self.recipient_phone.contains(&q)
            || self
                .docket_number
                .as_deref()
                .is_some_and(|d| contains_ci(d, &q))
    }
}

impl Record for Message {
    const COLLECTION: Collection = Collection::Messages;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for Message {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// One SMS sent or received. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageHistory {
    pub id: Uuid,
    pub direction: Direction,
    pub from: String,
    pub to: String,
    pub body: String,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub num_segments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    pub sent_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MessageHistory {
    pub fn new(
        direction: Direction,
        from: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
        status: DeliveryStatus,
        num_segments: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            direction,
            from: from.into(),
            to: to.into(),
            body: body.into(),
            status,
            twilio_sid: None,
            twilio_status: None,
            error_code: None,
            error_message: None,
            num_segments,
            price: None,
            price_unit: None,
            case_id: None,
            contact_id: None,
            sent_at: now,
            delivered_at: None,
            created_at: now,
        }
    }

    /// Search by phone number or body, optionally restricted to one direction
    pub fn matches(&self, query: &str, direction: Option<Direction>) -> bool {
        if direction.is_some_and(|d| d != self.direction) {
            return false;
        }
        let q = query.trim().to_lowercase();
        q.is_empty() || self.from.contains(&q) || self.to.contains(&q) || contains_ci(&self.body, &q)
    }
}

impl Record for MessageHistory {
    const COLLECTION: Collection = Collection::MessageHistory;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scheduled(at: DateTime<Utc>) -> Message {
        Message::new(
            "contact-1",
            "Maria Lopez",
            "+15551234567",
            MessageType::HearingReminder,
            "Hearing",
            "Your hearing is tomorrow",
            at,
        )
    }

    #[test]
    fn test_message_due_when_past_schedule() {
        let now = Utc::now();
        let msg = scheduled(now - Duration::minutes(1));
        assert!(msg.is_due(now));

        let msg = scheduled(now + Duration::hours(3));
        assert!(!msg.is_due(now));
    }

    #[test]
    fn test_message_due_inside_reminder_window() {
        let now = Utc::now();
        let mut msg = scheduled(now + Duration::hours(3));
        msg.send_before = Some(24);
        assert!(msg.is_due(now));

        msg.send_before = Some(2);
        assert!(!msg.is_due(now));
    }

    #[test]
    fn test_huge_reminder_window_is_open() {
        let now = Utc::now();
        let mut msg = scheduled(now + Duration::days(30));
        msg.send_before = Some(u32::MAX);
        assert!(msg.is_due(now));
        assert!(msg.is_due(msg.scheduled_for - Duration::days(400_000)));
    }

    #[test]
    fn test_priority_follows_type() {
        let mut msg = scheduled(Utc::now());
        assert_eq!(msg.priority(), Priority::High);
        msg.message_type = MessageType::Emergency;
        assert_eq!(msg.priority(), Priority::Urgent);
    }

    #[test]
    fn test_only_scheduled_messages_are_due() {
        let now = Utc::now();
        let mut msg = scheduled(now - Duration::hours(1));
        msg.status = MessageStatus::Cancelled;
        assert!(!msg.is_due(now));
    }

    #[test]
    fn test_history_matches_direction() {
        let h = MessageHistory::new(
            Direction::Inbound,
            "+15551234567",
            "+15550000000",
            "Running late",
            DeliveryStatus::Received,
            1,
        );
        assert!(h.matches("late", None));
        assert!(h.matches("555123", Some(Direction::Inbound)));
        assert!(!h.matches("", Some(Direction::Outbound)));
    }

    #[test]
    fn test_history_has_no_updated_at() {
        let h = MessageHistory::new(
            Direction::Outbound,
            "a",
            "b",
            "body",
            DeliveryStatus::Sent,
            1,
        );
        let json = serde_json::to_value(&h).unwrap();
        assert!(json.get("updatedAt").is_none());
        assert_eq!(json["numSegments"], 1);
        assert_eq!(json["direction"], "outbound");
    }
}
