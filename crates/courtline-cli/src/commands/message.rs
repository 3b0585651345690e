//! Outbox and message-history command handlers

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Args, Subcommand};

use courtline_core::messaging::calculate_message_segments;
use courtline_core::models::{
    Case, Contact, Direction, EntityType, Message, MessageHistory, MessageStatus, MessageTemplate,
    MessageType,
};
use courtline_core::outbox::{self, SendReport, TemplateRequest};
use courtline_core::Store;

use super::{parse_when, resolve, Managed};
use crate::editor::text_or_compose;
use crate::output::{Output, Tabular};

impl Managed for Message {
    const ENTITY: EntityType = EntityType::Message;

    fn describe(&self) -> String {
        format!("message '{}' to {}", self.subject, self.recipient_name)
    }
}

#[derive(Subcommand)]
pub enum MessageCommands {
    /// Schedule a message to a contact
    #[command(alias = "create")]
    Add(NewMessage),
    /// Schedule a message rendered from a template
    FromTemplate {
        /// Template ID or prefix
        #[arg(long)]
        template: String,
        /// Contact ID or prefix
        #[arg(long)]
        contact: String,
        /// Case ID or prefix supplying hearing details
        #[arg(long)]
        case: Option<String>,
        /// When to send (defaults to now)
        #[arg(long)]
        at: Option<String>,
        /// Hours before `at` when sending may start
        #[arg(long)]
        send_before: Option<u32>,
    },
    /// List outbox messages
    #[command(alias = "ls")]
    List {
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long)]
        status: Option<MessageStatus>,
    },
    /// List messages that are due now
    Due,
    /// Send every due message
    SendDue,
    /// Send one scheduled message now
    Send { id: String },
    /// Cancel a scheduled message
    Cancel { id: String },
    Show { id: String },
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Args)]
pub struct NewMessage {
    /// Contact ID or prefix
    #[arg(long)]
    contact: String,
    /// Case ID or prefix
    #[arg(long)]
    case: Option<String>,
    #[arg(long = "type", default_value = "general")]
    message_type: MessageType,
    #[arg(long)]
    subject: String,
    /// Message text (opens $EDITOR when omitted)
    #[arg(long)]
    body: Option<String>,
    /// When to send (defaults to now)
    #[arg(long)]
    at: Option<String>,
    /// Hours before `at` when sending may start
    #[arg(long)]
    send_before: Option<u32>,
}

fn add(store: &mut Store, new: NewMessage, output: &Output) -> Result<()> {
    let contact: Contact = resolve(store, &new.contact)?;
    let case: Option<Case> = new.case.map(|c| resolve(store, &c)).transpose()?;
    let scheduled_for = new.at.as_deref().map(parse_when).transpose()?.unwrap_or_else(Utc::now);
    let body = text_or_compose(
        new.body,
        &format!("Message to {} ({})", contact.full_name(), contact.phone_number),
    )?;

    let mut message = Message::new(
        contact.id.to_string(),
        contact.full_name(),
        contact.phone_number.clone(),
        new.message_type,
        new.subject,
        body,
        scheduled_for,
    );
    message.send_before = new.send_before;
    if let Some(case) = case {
        message.case_id = Some(case.id.to_string());
        message.docket_number = Some(case.docket_number);
    }

    let segments = calculate_message_segments(&message.body);
    if segments > 1 {
        output.warn(&format!("Message will be sent as {} SMS segments", segments));
    }
    if !contact.sms_consent {
        output.warn(&format!("{} has not consented to SMS", contact.full_name()));
    }
    super::create(store, message, output)?;
    Ok(())
}

fn print_report(report: &SendReport, output: &Output) {
    let all: Vec<Message> = report.sent.iter().chain(&report.failed).cloned().collect();
    output.print_value(&all, |_| {
        if report.is_empty() {
            println!("No messages due.");
            return;
        }
        for message in &report.sent {
            println!("✓ Sent {} to {}", message.subject, message.recipient_phone);
        }
        for message in &report.failed {
            println!(
                "✗ Failed {} to {}: {}",
                message.subject,
                message.recipient_phone,
                message.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        println!("\n{} sent, {} failed", report.sent.len(), report.failed.len());
    });
    if output.is_quiet() {
        for message in &report.sent {
            println!("{}", message.key());
        }
    }
}

pub fn run(command: MessageCommands, store: &mut Store, output: &Output) -> Result<()> {
    let now = Utc::now();
    match command {
        MessageCommands::Add(new) => add(store, new, output),
        MessageCommands::FromTemplate {
            template,
            contact,
            case,
            at,
            send_before,
        } => {
            let template: MessageTemplate = resolve(store, &template)?;
            let contact: Contact = resolve(store, &contact)?;
            let case_id = case
                .map(|c| resolve::<Case>(store, &c).map(|c| c.id))
                .transpose()?;
            let scheduled_for = at.as_deref().map(parse_when).transpose()?.unwrap_or(now);

            let message = outbox::schedule_from_template(
                store,
                TemplateRequest {
                    template_id: template.id,
                    contact_id: contact.id,
                    case_id,
                    scheduled_for,
                    send_before,
                },
            )?;
            output.success(&format!("Scheduled {}", message.describe()));
            output.print_record(&message);
            Ok(())
        }
        MessageCommands::List { query, status } => {
            let mut messages: Vec<Message> = store
                .get_all::<Message>()?
                .into_iter()
                .filter(|m| m.matches(&query))
                .filter(|m| status.map_or(true, |s| m.status == s))
                .collect();
            messages.sort_by_key(|m| m.scheduled_for);
            output.print_records(&messages);
            Ok(())
        }
        MessageCommands::Due => {
            output.print_records(&outbox::due_messages(store, now)?);
            Ok(())
        }
        MessageCommands::SendDue => {
            let report = outbox::send_due(store, now)?;
            print_report(&report, output);
            Ok(())
        }
        MessageCommands::Send { id } => {
            let message: Message = resolve(store, &id)?;
            let message = outbox::send_now(store, message.id, now)?;
            let report = match message.status {
                MessageStatus::Sent | MessageStatus::Delivered => SendReport {
                    sent: vec![message],
                    failed: vec![],
                },
                _ => SendReport {
                    sent: vec![],
                    failed: vec![message],
                },
            };
            print_report(&report, output);
            Ok(())
        }
        MessageCommands::Cancel { id } => {
            let message: Message = resolve(store, &id)?;
            let cancelled = outbox::cancel(store, message.id)?
                .ok_or_else(|| anyhow!("Message not found: {}", id))?;
            output.success(&format!("Cancelled {}", cancelled.describe()));
            Ok(())
        }
        MessageCommands::Show { id } => super::show::<Message>(store, &id, output),
        MessageCommands::Delete { id } => super::delete::<Message>(store, &id, output),
    }
}

/// Sent and received SMS, newest first
pub fn history(
    store: &Store,
    query: &str,
    direction: Option<Direction>,
    limit: Option<usize>,
    output: &Output,
) -> Result<()> {
    let mut rows: Vec<MessageHistory> = store
        .get_all::<MessageHistory>()?
        .into_iter()
        .filter(|h| h.matches(query, direction))
        .collect();
    rows.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    output.print_records(&rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use courtline_core::models::{CaseType, Relationship};

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet, true)
    }

    fn consenting(store: &mut Store) -> Contact {
        let mut contact = Contact::new("Maria", "Lopez", Relationship::Mother, "+15551234567");
        contact.grant_sms_consent(Utc::now().date_naive());
        store.add(contact).unwrap()
    }

    #[test]
    fn test_add_and_send_due() {
        let mut store = Store::in_memory();
        let contact = consenting(&mut store);
        let case = store
            .add(Case::new("JV-2024-001", "In re Lopez", CaseType::Dependency))
            .unwrap();

        let new = NewMessage {
            contact: contact.id.to_string(),
            case: Some(case.id.to_string()),
            message_type: MessageType::CaseUpdate,
            subject: "Update".to_string(),
            body: Some("Your case has been updated.".to_string()),
            at: Some("2020-01-01T09:00".to_string()),
            send_before: None,
        };
        run(MessageCommands::Add(new), &mut store, &quiet()).unwrap();

        let messages: Vec<Message> = store.get_all().unwrap();
        assert_eq!(messages[0].docket_number.as_deref(), Some("JV-2024-001"));
        assert_eq!(messages[0].recipient_phone, "+15551234567");

        run(MessageCommands::SendDue, &mut store, &quiet()).unwrap();
        let messages: Vec<Message> = store.get_all().unwrap();
        assert_eq!(messages[0].status, MessageStatus::Delivered);
        assert!(messages[0].delivered_at.is_some());
        assert_eq!(store.get_all::<MessageHistory>().unwrap().len(), 1);
    }

    #[test]
    fn test_from_template() {
        let mut store = Store::in_memory();
        store.seed_default_templates().unwrap();
        let contact = consenting(&mut store);
        let template = store
            .get_all::<MessageTemplate>()
            .unwrap()
            .into_iter()
            .find(|t| t.name == "Hearing Reminder")
            .unwrap();

        run(
            MessageCommands::FromTemplate {
                template: template.id.to_string(),
                contact: contact.id.to_string(),
                case: None,
                at: Some("2030-05-01".to_string()),
                send_before: Some(24),
            },
            &mut store,
            &quiet(),
        )
        .unwrap();

        let messages: Vec<Message> = store.get_all().unwrap();
        assert_eq!(messages[0].message_type, MessageType::HearingReminder);
        assert!(messages[0].body.contains("Maria Lopez"));
        assert_eq!(messages[0].send_before, Some(24));
    }

    #[test]
    fn test_cancel() {
        let mut store = Store::in_memory();
        let contact = consenting(&mut store);
        let message = store
            .add(Message::new(
                contact.id.to_string(),
                contact.full_name(),
                contact.phone_number.clone(),
                MessageType::General,
                "Hi",
                "Hello",
                Utc::now() + chrono::Duration::days(1),
            ))
            .unwrap();

        run(MessageCommands::Cancel { id: message.id.to_string() }, &mut store, &quiet()).unwrap();
        let stored: Message = store.get_by_id(message.id).unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Cancelled);
    }
}
