//! Inbox command handlers

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;

use courtline_core::audit::log_message_action;
use courtline_core::inbox;
use courtline_core::models::{AuditAction, Case, InboxStatus, IncomingMessage};
use courtline_core::Store;

use super::resolve;
use crate::editor::{confirm, text_or_compose};
use crate::output::{short_id, Output};

/// Number messages are received on when `--to` is omitted
const DEFAULT_INBOUND_NUMBER: &str = "+15550000000";

#[derive(Subcommand)]
pub enum InboxCommands {
    /// List incoming messages, newest first
    #[command(alias = "ls")]
    List {
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long)]
        status: Option<InboxStatus>,
    },
    Show { id: String },
    /// Record a simulated incoming SMS
    Receive {
        /// Sender phone number
        #[arg(long)]
        from: String,
        #[arg(long, default_value = DEFAULT_INBOUND_NUMBER)]
        to: String,
        body: String,
    },
    /// Change review status
    Status { id: String, status: InboxStatus },
    Tag { id: String, tag: String },
    Untag { id: String, tag: String },
    /// Link to a case, or unlink with --clear
    Link {
        id: String,
        /// Case ID or prefix
        case: Option<String>,
        #[arg(long, conflicts_with = "case")]
        clear: bool,
    },
    /// Replace the review notes
    Notes { id: String, notes: String },
    /// Assign to a staff member, or unassign when omitted
    Assign { id: String, assignee: Option<String> },
    /// Reply to the sender
    Respond {
        id: String,
        /// Reply text (opens $EDITOR when omitted)
        message: Option<String>,
    },
    #[command(alias = "rm")]
    Delete { id: String },
}

fn report(output: &Output, verb: &str, message: &IncomingMessage) {
    output.success(&format!("{} message from {}", verb, message.from));
    output.print_record(message);
}

pub fn run(command: InboxCommands, store: &mut Store, output: &Output) -> Result<()> {
    let now = Utc::now();
    match command {
        InboxCommands::List { query, status } => {
            output.print_records(&inbox::list(store, &query, status)?);
        }
        InboxCommands::Show { id } => {
            let message: IncomingMessage = resolve(store, &id)?;
            log_message_action(
                store,
                AuditAction::View,
                message.id,
                format!("Viewed message from {}", message.from),
                vec![],
            )?;
            output.print_record(&message);
        }
        InboxCommands::Receive { from, to, body } => {
            let message = inbox::receive(store, &from, &to, &body, now)?;
            if message.linked_contact_id.is_none() {
                output.warn(&format!("No contact matches {}", from));
            }
            report(output, "Received", &message);
        }
        InboxCommands::Status { id, status } => {
            let message: IncomingMessage = resolve(store, &id)?;
            let message = inbox::set_status(store, message.id, status, now)?;
            report(output, "Updated", &message);
        }
        InboxCommands::Tag { id, tag } => {
            let message: IncomingMessage = resolve(store, &id)?;
            report(output, "Tagged", &inbox::add_tag(store, message.id, &tag)?);
        }
        InboxCommands::Untag { id, tag } => {
            let message: IncomingMessage = resolve(store, &id)?;
            report(output, "Untagged", &inbox::remove_tag(store, message.id, &tag)?);
        }
        InboxCommands::Link { id, case, clear } => {
            let message: IncomingMessage = resolve(store, &id)?;
            let case_id = match (case, clear) {
                (Some(case), false) => Some(resolve::<Case>(store, &case)?.id.to_string()),
                _ => None,
            };
            report(output, "Linked", &inbox::link_case(store, message.id, case_id)?);
        }
        InboxCommands::Notes { id, notes } => {
            let message: IncomingMessage = resolve(store, &id)?;
            report(output, "Saved notes on", &inbox::save_notes(store, message.id, &notes)?);
        }
        InboxCommands::Assign { id, assignee } => {
            let message: IncomingMessage = resolve(store, &id)?;
            report(output, "Assigned", &inbox::assign(store, message.id, assignee)?);
        }
        InboxCommands::Respond { id, message: text } => {
            let message: IncomingMessage = resolve(store, &id)?;
            let hint = format!("Reply to {}:\n{}", message.from, message.body);
            let text = text_or_compose(text, &hint)?;
            report(output, "Replied to", &inbox::respond(store, message.id, &text, now)?);
        }
        InboxCommands::Delete { id } => {
            let message: IncomingMessage = resolve(store, &id)?;
            if output.should_prompt() {
                println!("Delete {}: message from {}", short_id(&message.id), message.from);
                if !confirm("Are you sure?")? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            store
                .delete::<IncomingMessage>(message.id)
                .context("Failed to delete inbox message")?;
            log_message_action(
                store,
                AuditAction::Delete,
                message.id,
                format!("Deleted message from {}", message.from),
                vec![],
            )?;
            output.success(&format!("Deleted message from {}", message.from));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use courtline_core::models::{CaseType, Contact, MessageHistory, Relationship};

    #[test]
    fn test_receive_link_and_respond() {
        let mut store = Store::in_memory();
        let output = Output::new(OutputFormat::Quiet, true);
        let case = store
            .add(Case::new("JV-2024-007", "In re Park", CaseType::Dependency))
            .unwrap();
        store
            .add(Contact::new("Jin", "Park", Relationship::Father, "+15557654321"))
            .unwrap();

        run(
            InboxCommands::Receive {
                from: "+15557654321".to_string(),
                to: DEFAULT_INBOUND_NUMBER.to_string(),
                body: "Can I reschedule?".to_string(),
            },
            &mut store,
            &output,
        )
        .unwrap();
        let message = inbox::list(&store, "", None).unwrap().remove(0);
        assert!(message.linked_contact_id.is_some());
        assert!(message.requires_response);
        let id = message.id.to_string();

        run(
            InboxCommands::Link { id: id.clone(), case: Some(case.id.to_string()), clear: false },
            &mut store,
            &output,
        )
        .unwrap();
        run(
            InboxCommands::Respond { id: id.clone(), message: Some("Call us.".to_string()) },
            &mut store,
            &output,
        )
        .unwrap();
        run(
            InboxCommands::Status { id, status: InboxStatus::Processed },
            &mut store,
            &output,
        )
        .unwrap();

        let stored: IncomingMessage = store.get_by_id(message.id).unwrap().unwrap();
        assert_eq!(stored.linked_case_id, Some(case.id.to_string()));
        assert_eq!(stored.response_message.as_deref(), Some("Call us."));
        assert!(!stored.requires_response);
        assert_eq!(stored.status, InboxStatus::Processed);
        assert!(stored.processed_by.is_some());
        // inbound receipt plus outbound reply
        assert_eq!(store.get_all::<MessageHistory>().unwrap().len(), 2);
    }

    #[test]
    fn test_link_clear() {
        let mut store = Store::in_memory();
        let output = Output::new(OutputFormat::Quiet, true);
        let mut message = IncomingMessage::new("+15550001111", "+15550000000", "hi", "SM1");
        message.linked_case_id = Some("old".to_string());
        let message = store.add(message).unwrap();

        run(
            InboxCommands::Link { id: message.id.to_string(), case: None, clear: true },
            &mut store,
            &output,
        )
        .unwrap();
        let stored: IncomingMessage = store.get_by_id(message.id).unwrap().unwrap();
        assert!(stored.linked_case_id.is_none());
    }
}
