//! Incoming-message workflow
//!
//! Receiving is simulated: a reply is stored as an unread
//! [`IncomingMessage`], tagged by keyword, linked to the contact whose phone
//! number matches, and mirrored into the message history.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::audit::log_message_action;
use crate::messaging::calculate_message_segments;
use crate::models::{
    AuditAction, Contact, DeliveryStatus, Direction, IncomingMessage, InboxStatus,
    MessageHistory, Priority,
};
use crate::outbox::{confirm_delivery, fake_sid};
use crate::store::Store;

/// Keyword rules for automatic tags: any keyword adds the tag
const TAG_RULES: &[(&str, &[&str])] = &[
    ("hearing-confirmation", &["will attend", "will be there", "confirm"]),
    ("attendance", &["attend", "be there"]),
    ("date-change-request", &["reschedule", "change my", "different date", "postpone"]),
    ("acknowledgment", &["thank", "got it", "received"]),
    ("urgent", &["urgent", "emergency", "asap"]),
];

/// Tags suggested by the message body
pub fn auto_tags(body: &str) -> Vec<String> {
    let text = body.to_lowercase();
    TAG_RULES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Record a simulated incoming SMS
pub fn receive(
    store: &mut Store,
    from: &str,
    to: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<IncomingMessage> {
    let mut message = IncomingMessage::new(from, to, body, fake_sid());
    message.received_at = now;

    let tags = auto_tags(body);
    message.auto_tagged = !tags.is_empty();
    for tag in tags {
        message.add_tag(tag);
    }
    if message.tags.iter().any(|t| t == "urgent") {
        message.priority = Priority::Urgent;
    }
    message.requires_response = body.contains('?') || message.tags.iter().any(|t| t == "date-change-request");

    let contact = store
        .get_all::<Contact>()?
        .into_iter()
        .find(|c| c.has_phone(from));
    if let Some(contact) = &contact {
        message.linked_contact_id = Some(contact.id.to_string());
        if let [only] = contact.linked_cases.as_slice() {
            message.linked_case_id = Some(only.clone());
        }
    }

    let message = store.add(message)?;

    let mut history = MessageHistory::new(
        Direction::Inbound,
        from,
        to,
        body,
        DeliveryStatus::Received,
        calculate_message_segments(body),
    );
    history.twilio_sid = Some(message.twilio_sid.clone());
    history.twilio_status = Some("received".to_string());
    history.contact_id = message.linked_contact_id.clone();
    history.case_id = message.linked_case_id.clone();
    history.sent_at = now;
    store.add(history)?;

    info!(
        "Received message {} from {} (contact: {})",
        message.id,
        from,
        contact.map(|c| c.full_name()).unwrap_or_else(|| "unknown".to_string())
    );
    Ok(message)
}

fn edit(
    store: &mut Store,
    id: Uuid,
    f: impl FnOnce(&mut IncomingMessage),
) -> Result<IncomingMessage> {
    store
        .modify(id, f)?
        .ok_or_else(|| anyhow!("Inbox message not found: {}", id))
}

/// Change the review status; processing records who and when
pub fn set_status(
    store: &mut Store,
    id: Uuid,
    status: InboxStatus,
    now: DateTime<Utc>,
) -> Result<IncomingMessage> {
    let by = store.config().user_name.clone();
    let message = edit(store, id, |m| m.set_status(status, &by, now))?;
    log_message_action(
        store,
        AuditAction::Update,
        id,
        format!("Marked message from {} as {}", message.from, status),
        vec![],
    )?;
    Ok(message)
}

pub fn add_tag(store: &mut Store, id: Uuid, tag: &str) -> Result<IncomingMessage> {
    edit(store, id, |m| {
        m.add_tag(tag);
    })
}

pub fn remove_tag(store: &mut Store, id: Uuid, tag: &str) -> Result<IncomingMessage> {
    edit(store, id, |m| {
        m.remove_tag(tag);
    })
}

/// Link to a case id (unchecked); `None` unlinks
pub fn link_case(store: &mut Store, id: Uuid, case_id: Option<String>) -> Result<IncomingMessage> {
    edit(store, id, |m| m.linked_case_id = case_id)
}

pub fn assign(store: &mut Store, id: Uuid, assignee: Option<String>) -> Result<IncomingMessage> {
    edit(store, id, |m| m.assigned_to = assignee)
}

pub fn save_notes(store: &mut Store, id: Uuid, notes: &str) -> Result<IncomingMessage> {
    let notes = notes.trim();
    edit(store, id, |m| {
        m.notes = (!notes.is_empty()).then(|| notes.to_string());
    })
}

/// Reply to an incoming message. The reply is recorded on the message and
/// as a simulated outbound history row.
pub fn respond(
    store: &mut Store,
    id: Uuid,
    response: &str,
    now: DateTime<Utc>,
) -> Result<IncomingMessage> {
    let message = edit(store, id, |m| {
        m.response_message = Some(response.to_string());
        m.requires_response = false;
    })?;

    let mut history = MessageHistory::new(
        Direction::Outbound,
        message.to.clone(),
        message.from.clone(),
        response,
        DeliveryStatus::Sent,
        calculate_message_segments(response),
    );
    history.twilio_sid = Some(fake_sid());
    history.contact_id = message.linked_contact_id.clone();
    history.case_id = message.linked_case_id.clone();
    history.sent_at = now;
    confirm_delivery(store, &mut history, now)?;
    store.add(history)?;

    log_message_action(
        store,
        AuditAction::Send,
        id,
        format!("Replied to {}", message.from),
        vec![],
    )?;
    Ok(message)
}

/// Messages matching the search, newest first
pub fn list(
    store: &Store,
    query: &str,
    status: Option<InboxStatus>,
) -> Result<Vec<IncomingMessage>> {
    let mut messages: Vec<IncomingMessage> = store
        .get_all::<IncomingMessage>()?
        .into_iter()
        .filter(|m| m.matches(query, status))
        .collect();
    messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Relationship;

    #[test]
    fn test_auto_tags() {
        assert_eq!(
            auto_tags("Yes, I will attend the hearing on Monday"),
            vec!["hearing-confirmation", "attendance"]
        );
        assert_eq!(
            auto_tags("Can you change my hearing date?"),
            vec!["date-change-request"]
        );
        assert_eq!(auto_tags("Thank you for the reminder"), vec!["acknowledgment"]);
        assert!(auto_tags("ok").is_empty());
    }

    #[test]
    fn test_receive_links_contact_and_history() {
        let mut store = Store::in_memory();
        let mut contact = Contact::new("Jane", "Smith", Relationship::Mother, "+15551234567");
        contact.link_case("case-7");
        let contact = store.add(contact).unwrap();

        let now = Utc::now();
        let msg = receive(
            &mut store,
            "(555) 123-4567",
            "+15550000000",
            "Can you change my hearing date?",
            now,
        )
        .unwrap();

        assert_eq!(msg.status, InboxStatus::Unread);
        assert!(msg.auto_tagged);
        assert!(msg.requires_response);
        assert_eq!(msg.linked_contact_id, Some(contact.id.to_string()));
        assert_eq!(msg.linked_case_id.as_deref(), Some("case-7"));
        assert_eq!(msg.received_at, now);

        let history: Vec<MessageHistory> = store.get_all().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].direction, Direction::Inbound);
        assert_eq!(history[0].status, DeliveryStatus::Received);
        assert_eq!(history[0].contact_id, msg.linked_contact_id);
    }

    #[test]
    fn test_receive_unknown_sender() {
        let mut store = Store::in_memory();
        let msg = receive(&mut store, "+15550001111", "+15550000000", "URGENT call me", Utc::now())
            .unwrap();
        assert!(msg.linked_contact_id.is_none());
        assert_eq!(msg.priority, Priority::Urgent);
        assert!(!msg.requires_response);
    }

    #[test]
    fn test_workflow() {
        let mut store = Store::in_memory();
        let msg = receive(&mut store, "+15550001111", "+15550000000", "Hello?", Utc::now()).unwrap();

        let msg = add_tag(&mut store, msg.id, "follow-up").unwrap();
        assert!(msg.tags.contains(&"follow-up".to_string()));
        let msg = remove_tag(&mut store, msg.id, "follow-up").unwrap();
        assert!(msg.tags.is_empty());

        let msg = link_case(&mut store, msg.id, Some("case-1".to_string())).unwrap();
        assert_eq!(msg.linked_case_id.as_deref(), Some("case-1"));

        let msg = save_notes(&mut store, msg.id, "  called back  ").unwrap();
        assert_eq!(msg.notes.as_deref(), Some("called back"));
        let msg = save_notes(&mut store, msg.id, "").unwrap();
        assert!(msg.notes.is_none());

        let now = Utc::now();
        let msg = set_status(&mut store, msg.id, InboxStatus::Processed, now).unwrap();
        assert_eq!(msg.processed_by.as_deref(), Some("Current User"));
        assert_eq!(msg.processed_at, Some(now));

        let msg = respond(&mut store, msg.id, "We will call you today.", now).unwrap();
        assert_eq!(msg.response_message.as_deref(), Some("We will call you today."));
        assert!(!msg.requires_response);

        let history: Vec<MessageHistory> = store.get_all().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].direction, Direction::Outbound);
        assert_eq!(history[1].to, "+15550001111");
        assert_eq!(history[1].status, DeliveryStatus::Delivered);
        assert_eq!(history[1].delivered_at, Some(now));
    }

    #[test]
    fn test_list_filters_and_orders() {
        let mut store = Store::in_memory();
        let now = Utc::now();
        let older = receive(&mut store, "+15550001111", "x", "first", now - chrono::Duration::hours(1))
            .unwrap();
        let newer = receive(&mut store, "+15550002222", "x", "second", now).unwrap();
        set_status(&mut store, older.id, InboxStatus::Reviewing, now).unwrap();

        let all = list(&store, "", None).unwrap();
        assert_eq!(all[0].id, newer.id);

        let reviewing = list(&store, "", Some(InboxStatus::Reviewing)).unwrap();
        assert_eq!(reviewing.len(), 1);
        assert_eq!(reviewing[0].id, older.id);
    }

    #[test]
    fn test_unknown_id() {
        let mut store = Store::in_memory();
        assert!(add_tag(&mut store, Uuid::new_v4(), "x").is_err());
    }
}
