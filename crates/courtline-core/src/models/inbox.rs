//! Incoming SMS awaiting review

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{contains_ci, push_unique, remove_value, Mutable, Priority, Record};
use crate::storage::Collection;

string_enum! {
    pub enum InboxStatus {
        Unread => ("unread", "Unread"),
        Reviewing => ("reviewing", "Reviewing"),
        Processed => ("processed", "Processed"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub body: String,
    pub twilio_sid: String,
    pub received_at: DateTime<Utc>,
    pub status: InboxStatus,
    pub auto_tagged: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub priority: Priority,
    pub requires_response: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// An unread message received now
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
        twilio_sid: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            body: body.into(),
            twilio_sid: twilio_sid.into(),
            received_at: now,
            status: InboxStatus::Unread,
            auto_tagged: false,
            tags: Vec::new(),
            linked_case_id: None,
            linked_contact_id: None,
            assigned_to: None,
            priority: Priority::Medium,
            requires_response: false,
            response_message: None,
            notes: None,
            processed_at: None,
            processed_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status`. Entering `processed` stamps who and when; leaving it
    /// clears both.
    pub fn set_status(&mut self, status: InboxStatus, by: &str, now: DateTime<Utc>) {
        self.status = status;
        if status == InboxStatus::Processed {
            self.processed_at = Some(now);
            self.processed_by = Some(by.to_string());
        } else {
            self.processed_at = None;
            self.processed_by = None;
        }
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        push_unique(&mut self.tags, tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        remove_value(&mut self.tags, tag)
    }

    pub fn matches(&self, query: &str, status: Option<InboxStatus>) -> bool {
        if status.is_some_and(|s| s != self.status) {
            return false;
        }
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.from.contains(&q)
            || contains_ci(&self.body, &q)
            || self.tags.iter().any(|t| contains_ci(t, &q))
    }
}

impl Record for IncomingMessage {
    const COLLECTION: Collection = Collection::IncomingMessages;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for IncomingMessage {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
