//! Scheduled-message outbox
//!
//! Sending is simulated: a due message gets a fabricated provider SID, is
//! marked `sent`, and an outbound [`MessageHistory`] row is appended. With
//! delivery reports enabled the provider confirms at once, so the message and
//! its history row are `delivered` instead. When compliance requires SMS
//! consent, messages to contacts without consent are marked `failed`.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{log_audit, log_message_action, AuditEntry};
use crate::messaging::{
    calculate_message_segments, generate_message_body, template_variables,
    validate_message_length, DEFAULT_MAX_SEGMENTS,
};
use crate::models::{
    AuditAction, Case, ComplianceSettings, Contact, DeliveryStatus, Direction, EntityType,
    Message, MessageHistory, MessageStatus, MessageTemplate, MessageType, PhoneNumber,
    Severity, TwilioConfig,
};
use crate::storage::Collection;
use crate::store::Store;
use crate::validation::Validate;

/// Sender shown when no phone number or messaging service is configured
const FALLBACK_SENDER: &str = "courtline";

/// A fabricated provider message SID
pub fn fake_sid() -> String {
    format!("SM{}", Uuid::new_v4().simple())
}

/// Result of processing the outbox
#[derive(Debug, Default)]
pub struct SendReport {
    pub sent: Vec<Message>,
    pub failed: Vec<Message>,
}

impl SendReport {
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.failed.is_empty()
    }
}

/// Scheduled messages that are due at `now`, in schedule order
pub fn due_messages(store: &Store, now: DateTime<Utc>) -> Result<Vec<Message>> {
    let mut due: Vec<Message> = store
        .get_all::<Message>()?
        .into_iter()
        .filter(|m| m.is_due(now))
        .collect();
    due.sort_by_key(|m| m.scheduled_for);
    Ok(due)
}

/// Send every due message
pub fn send_due(store: &mut Store, now: DateTime<Utc>) -> Result<SendReport> {
    let mut report = SendReport::default();
    for message in due_messages(store, now)? {
        let result = deliver(store, message, now)?;
        match result.status {
            MessageStatus::Sent | MessageStatus::Delivered => report.sent.push(result),
            _ => report.failed.push(result),
        }
    }
    Ok(report)
}

/// Send one scheduled message now, regardless of its schedule
pub fn send_now(store: &mut Store, id: Uuid, now: DateTime<Utc>) -> Result<Message> {
    let message: Message = store
        .get_by_id(id)?
        .ok_or_else(|| anyhow!("Message not found: {}", id))?;
    if !message.is_pending() {
        bail!("Message {} is {}, not scheduled", id, message.status);
    }
    deliver(store, message, now)
}

/// Cancel a scheduled message. Returns `None` when the id is unknown.
pub fn cancel(store: &mut Store, id: Uuid) -> Result<Option<Message>> {
    let Some(message) = store.get_by_id::<Message>(id)? else {
        return Ok(None);
    };
    if !message.is_pending() {
        bail!("Only scheduled messages can be cancelled ({} is {})", id, message.status);
    }
    let cancelled = store.modify(id, |m: &mut Message| m.status = MessageStatus::Cancelled)?;
    log_message_action(
        store,
        AuditAction::Update,
        id,
        format!("Cancelled message to {}", message.recipient_name),
        vec![],
    )?;
    Ok(cancelled)
}

fn deliver(store: &mut Store, message: Message, now: DateTime<Utc>) -> Result<Message> {
    match refusal(store, &message)? {
        None => mark_sent(store, message, now),
        Some(reason) => mark_failed(store, message, reason, now),
    }
}

/// Why a message may not be sent, if anything
fn refusal(store: &Store, message: &Message) -> Result<Option<String>> {
    if !validate_message_length(&message.body, DEFAULT_MAX_SEGMENTS) {
        return Ok(Some(format!(
            "Message exceeds {} segments",
            DEFAULT_MAX_SEGMENTS
        )));
    }

    let compliance: ComplianceSettings = store.load_setting()?;
    if !compliance.require_consent_for_sms {
        return Ok(None);
    }

    let contact = Uuid::parse_str(&message.recipient_id)
        .ok()
        .map(|id| store.get_by_id::<Contact>(id))
        .transpose()?
        .flatten();
    match contact {
        Some(c) if c.sms_consent => Ok(None),
        Some(_) => Ok(Some("Recipient has not consented to SMS".to_string())),
        None => Ok(Some("Recipient contact not found; SMS consent unknown".to_string())),
    }
}

fn sender(store: &Store) -> Result<String> {
    let numbers: Vec<PhoneNumber> = store.get_all()?;
    let mut active = numbers.iter().filter(|n| n.active && n.capabilities.sms);
    if let Some(primary) = active.clone().find(|n| n.is_primary) {
        return Ok(primary.phone_number.clone());
    }
    if let Some(first) = active.next() {
        return Ok(first.phone_number.clone());
    }
    let twilio: TwilioConfig = store.load_setting()?;
    Ok(twilio
        .messaging_service_sid
        .unwrap_or_else(|| FALLBACK_SENDER.to_string()))
}

/// Make `id` the only primary number in the pool
pub fn set_primary_number(store: &mut Store, id: Uuid) -> Result<PhoneNumber> {
    let mut numbers: Vec<PhoneNumber> = store.get_all()?;
    if !numbers.iter().any(|n| n.id == id) {
        bail!("Phone number not found: {}", id);
    }
    let now = Utc::now();
    for number in numbers.iter_mut() {
        let primary = number.id == id;
        if number.is_primary != primary {
            number.is_primary = primary;
            number.updated_at = crate::models::later_than(number.updated_at, now);
        }
    }
    store.set(Collection::PhoneNumbers, &numbers)?;

    let number = numbers
        .into_iter()
        .find(|n| n.id == id)
        .ok_or_else(|| anyhow!("Phone number not found: {}", id))?;
    info!("Primary sending number is now {}", number.phone_number);
    Ok(number)
}

fn history_for(store: &Store, message: &Message, status: DeliveryStatus) -> Result<MessageHistory> {
    let mut history = MessageHistory::new(
        Direction::Outbound,
        sender(store)?,
        message.recipient_phone.clone(),
        message.body.clone(),
        status,
        calculate_message_segments(&message.body),
    );
    history.case_id = message.case_id.clone();
    history.contact_id = Some(message.recipient_id.clone());
    Ok(history)
}

/// Stamp an outbound history row with the simulated provider status. With
/// delivery reports enabled the provider confirms at once; otherwise the row
/// stays `sent`. Returns the delivery time, if any.
pub(crate) fn confirm_delivery(
    store: &Store,
    history: &mut MessageHistory,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    let twilio: TwilioConfig = store.load_setting()?;
    if twilio.enable_delivery_reports {
        history.status = DeliveryStatus::Delivered;
        history.twilio_status = Some("delivered".to_string());
        history.delivered_at = Some(now);
        Ok(Some(now))
    } else {
        history.status = DeliveryStatus::Sent;
        history.twilio_status = Some("sent".to_string());
        Ok(None)
    }
}

fn mark_sent(store: &mut Store, message: Message, now: DateTime<Utc>) -> Result<Message> {
    let sid = fake_sid();

    let mut history = history_for(store, &message, DeliveryStatus::Sent)?;
    history.twilio_sid = Some(sid.clone());
    history.sent_at = now;
    let delivered_at = confirm_delivery(store, &mut history, now)?;
    store.add(history)?;

    let sent_sid = sid.clone();
    let updated = store
        .modify(message.id, move |m: &mut Message| {
            m.status = match delivered_at {
                Some(_) => MessageStatus::Delivered,
                None => MessageStatus::Sent,
            };
            m.sent_at = Some(now);
            m.delivered_at = delivered_at;
            m.twilio_sid = Some(sent_sid);
            m.error_message = None;
        })?
        .ok_or_else(|| anyhow!("Message {} disappeared", message.id))?;

    info!(
        "Sent message {} to {} ({}, {})",
        message.id, message.recipient_phone, sid, updated.status
    );
    log_message_action(
        store,
        AuditAction::Send,
        message.id,
        format!("Sent {} to {}", message.message_type.label(), message.recipient_name),
        vec![],
    )?;
    Ok(updated)
}

fn mark_failed(
    store: &mut Store,
    message: Message,
    reason: String,
    now: DateTime<Utc>,
) -> Result<Message> {
    warn!("Not sending message {}: {}", message.id, reason);

    let mut history = history_for(store, &message, DeliveryStatus::Failed)?;
    history.error_message = Some(reason.clone());
    history.sent_at = now;
    store.add(history)?;

    let error = reason.clone();
    let updated = store
        .modify(message.id, move |m: &mut Message| {
            m.status = MessageStatus::Failed;
            m.error_message = Some(error);
        })?
        .ok_or_else(|| anyhow!("Message {} disappeared", message.id))?;

    log_audit(
        store,
        AuditEntry::new(
            AuditAction::Send,
            EntityType::Message,
            message.id,
            format!("Failed to send to {}: {}", message.recipient_name, reason),
        )
        .with_severity(Severity::Warning),
    )?;
    Ok(updated)
}

/// Render a template body and count the use
pub fn render_template(
    store: &mut Store,
    template_id: Uuid,
    variables: &std::collections::HashMap<String, String>,
) -> Result<(MessageTemplate, String)> {
    let template: MessageTemplate = store
        .get_by_id(template_id)?
        .ok_or_else(|| anyhow!("Template not found: {}", template_id))?;
    if !template.active {
        bail!("Template '{}' is inactive", template.name);
    }

    let body = generate_message_body(&template.body, variables);
    let template = store
        .modify(template_id, |t: &mut MessageTemplate| t.usage_count += 1)?
        .ok_or_else(|| anyhow!("Template {} disappeared", template_id))?;
    Ok((template, body))
}

/// What to schedule from a template
#[derive(Debug, Clone)]
pub struct TemplateRequest {
    pub template_id: Uuid,
    pub contact_id: Uuid,
    pub case_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub send_before: Option<u32>,
}

/// Schedule a message for a contact, rendered from a template with
/// variables filled from the contact and (optionally) a case
pub fn schedule_from_template(store: &mut Store, request: TemplateRequest) -> Result<Message> {
    let contact: Contact = store
        .get_by_id(request.contact_id)?
        .ok_or_else(|| anyhow!("Contact not found: {}", request.contact_id))?;
    let case: Option<Case> = match request.case_id {
        Some(id) => Some(
            store
                .get_by_id(id)?
                .ok_or_else(|| anyhow!("Case not found: {}", id))?,
        ),
        None => None,
    };

    let vars = template_variables(&contact, case.as_ref());
    let (template, body) = render_template(store, request.template_id, &vars)?;

    let message_type = template
        .category
        .parse::<MessageType>()
        .unwrap_or(MessageType::General);
    let mut message = Message::new(
        contact.id.to_string(),
        contact.full_name(),
        contact.phone_number.clone(),
        message_type,
        template.subject.clone(),
        body,
        request.scheduled_for,
    );
    message.send_before = request.send_before;
    if let Some(case) = &case {
        message.case_id = Some(case.id.to_string());
        message.docket_number = Some(case.docket_number.clone());
    }
    message.validate()?;

    let message = store.add(message)?;
    log_message_action(
        store,
        AuditAction::Create,
        message.id,
        format!("Scheduled '{}' for {}", template.name, message.recipient_name),
        vec![],
    )?;
    Ok(message)
}
