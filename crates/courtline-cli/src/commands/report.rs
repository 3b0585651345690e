//! Summary report command

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;

use courtline_core::reports::{self, Report};
use courtline_core::Store;

use crate::output::Output;

fn breakdown(label: &str, counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    let parts: Vec<String> = counts.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
    println!("  {:<18}{}", label, parts.join(", "));
}

fn print_human(report: &Report) {
    let r = report;
    println!("Cases");
    println!("  {:<18}{}", "total", r.cases.total);
    println!("  {:<18}{}", "active", r.cases.active);
    println!("  {:<18}{}", "upcoming hearings", r.cases.upcoming_hearings);
    breakdown("by status", &r.cases.by_status);
    breakdown("by type", &r.cases.by_type);
    breakdown("by priority", &r.cases.by_priority);

    println!("\nContacts");
    println!("  {:<18}{}", "total", r.contacts.total);
    println!("  {:<18}{}", "SMS eligible", r.contacts.sms_eligible);
    println!("  {:<18}{}", "consented", r.contacts.consented);
    println!("  {:<18}{}", "emergency", r.contacts.emergency);

    println!("\nParticipants");
    println!("  {:<18}{}", "total", r.participants.total);
    breakdown("by role", &r.participants.by_role);

    println!("\nDocuments");
    println!("  {:<18}{}", "total", r.documents.total);
    println!("  {:<18}{}", "active", r.documents.active);
    println!(
        "  {:<18}{} confidential, {} HIPAA, {} FERPA",
        "protected", r.documents.confidential, r.documents.hipaa, r.documents.ferpa
    );

    println!("\nSMS");
    println!(
        "  {:<18}{} scheduled, {} sent, {} failed, {} cancelled",
        "outbox", r.outbox.scheduled, r.outbox.sent, r.outbox.failed, r.outbox.cancelled
    );
    println!(
        "  {:<18}{} outbound, {} inbound",
        "history", r.history.outbound, r.history.inbound
    );
    println!(
        "  {:<18}{:.1}% ({} delivered, {} failed)",
        "delivery rate", r.history.delivery_rate, r.history.delivered, r.history.failed
    );
    println!(
        "  {:<18}{} unread, {} reviewing, {} processed, {} awaiting reply",
        "inbox", r.inbox.unread, r.inbox.reviewing, r.inbox.processed, r.inbox.requires_response
    );

    println!("\nAudit");
    println!("  {:<18}{}", "entries", r.audit.total);
    println!("  {:<18}{}", "today", r.audit.today);
    println!("  {:<18}{}", "critical", r.audit.critical);
}

pub fn run(store: &Store, output: &Output) -> Result<()> {
    let report = reports::generate(store, Utc::now())?;
    output.print_value(&report, print_human);
    Ok(())
}
