//! Summary statistics over the stored collections
//!
//! Every counter is computed from a full scan; the collections are small.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    AuditLog, Case, CaseStatus, Contact, DeliveryStatus, Direction, Document, DocumentStatus,
    InboxStatus, IncomingMessage, Message, MessageHistory, MessageStatus, Participant, Severity,
};
use crate::store::Store;

/// Count occurrences keyed by display string, in a stable order
fn tally<'a, I, K>(items: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a K>,
    K: ToString + 'a,
{
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.to_string()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseStats {
    pub total: usize,
    pub active: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub upcoming_hearings: usize,
}

impl CaseStats {
    pub fn compute(cases: &[Case], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        Self {
            total: cases.len(),
            active: cases.iter().filter(|c| c.status == CaseStatus::Active).count(),
            by_status: tally(cases.iter().map(|c| &c.status)),
            by_type: tally(cases.iter().map(|c| &c.case_type)),
            by_priority: tally(cases.iter().map(|c| &c.priority)),
            upcoming_hearings: cases.iter().filter(|c| c.has_upcoming_hearing(today)).count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactStats {
    pub total: usize,
    pub sms_eligible: usize,
    pub consented: usize,
    pub emergency: usize,
}

impl ContactStats {
    pub fn compute(contacts: &[Contact]) -> Self {
        Self {
            total: contacts.len(),
            sms_eligible: contacts.iter().filter(|c| c.is_sms_eligible()).count(),
            consented: contacts.iter().filter(|c| c.sms_consent).count(),
            emergency: contacts.iter().filter(|c| c.emergency_contact).count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStats {
    pub total: usize,
    pub by_role: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total: usize,
    pub active: usize,
    pub confidential: usize,
    pub hipaa: usize,
    pub ferpa: usize,
    pub total_bytes: u64,
}

impl DocumentStats {
    pub fn compute(documents: &[Document]) -> Self {
        Self {
            total: documents.len(),
            active: documents
                .iter()
                .filter(|d| d.status == DocumentStatus::Active)
                .count(),
            confidential: documents.iter().filter(|d| d.confidential).count(),
            hipaa: documents.iter().filter(|d| d.hipaa_protected).count(),
            ferpa: documents.iter().filter(|d| d.ferpa_protected).count(),
            total_bytes: documents.iter().map(|d| d.file_size).sum(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub outbound: usize,
    pub inbound: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Delivered share of outbound messages, in percent
    pub delivery_rate: f64,
}

impl HistoryStats {
    pub fn compute(history: &[MessageHistory]) -> Self {
        let outbound = history
            .iter()
            .filter(|h| h.direction == Direction::Outbound)
            .count();
        let delivered = history
            .iter()
            .filter(|h| h.status == DeliveryStatus::Delivered)
            .count();
        let failed = history
            .iter()
            .filter(|h| matches!(h.status, DeliveryStatus::Failed | DeliveryStatus::Undelivered))
            .count();
        let delivery_rate = if outbound == 0 {
            0.0
        } else {
            delivered as f64 / outbound as f64 * 100.0
        };

        Self {
            total: history.len(),
            outbound,
            inbound: history.len() - outbound,
            delivered,
            failed,
            delivery_rate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboxStats {
    pub total: usize,
    pub unread: usize,
    pub reviewing: usize,
    pub processed: usize,
    pub requires_response: usize,
}

impl InboxStats {
    pub fn compute(messages: &[IncomingMessage]) -> Self {
        let count = |status: InboxStatus| messages.iter().filter(|m| m.status == status).count();
        Self {
            total: messages.len(),
            unread: count(InboxStatus::Unread),
            reviewing: count(InboxStatus::Reviewing),
            processed: count(InboxStatus::Processed),
            requires_response: messages.iter().filter(|m| m.requires_response).count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total: usize,
    pub critical: usize,
    pub today: usize,
}

impl AuditStats {
    pub fn compute(logs: &[AuditLog], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        Self {
            total: logs.len(),
            critical: logs
                .iter()
                .filter(|l| l.severity == Severity::Critical)
                .count(),
            today: logs
                .iter()
                .filter(|l| l.timestamp.date_naive() == today)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboxStats {
    pub total: usize,
    pub scheduled: usize,
    pub sent: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl OutboxStats {
    pub fn compute(messages: &[Message]) -> Self {
        let count = |status: MessageStatus| messages.iter().filter(|m| m.status == status).count();
        Self {
            total: messages.len(),
            scheduled: count(MessageStatus::Scheduled),
            sent: count(MessageStatus::Sent) + count(MessageStatus::Delivered),
            failed: count(MessageStatus::Failed),
            cancelled: count(MessageStatus::Cancelled),
        }
    }
}

/// Everything the `report` command and dashboard show
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: Option<DateTime<Utc>>,
    pub cases: CaseStats,
    pub contacts: ContactStats,
    pub participants: ParticipantStats,
    pub documents: DocumentStats,
    pub history: HistoryStats,
    pub inbox: InboxStats,
    pub audit: AuditStats,
    pub outbox: OutboxStats,
}

/// Build a full report from the store
pub fn generate(store: &Store, now: DateTime<Utc>) -> Result<Report> {
    let participants: Vec<Participant> = store.get_all()?;

    Ok(Report {
        generated_at: Some(now),
        cases: CaseStats::compute(&store.get_all::<Case>()?, now),
        contacts: ContactStats::compute(&store.get_all::<Contact>()?),
        participants: ParticipantStats {
            total: participants.len(),
            by_role: tally(participants.iter().map(|p| &p.role)),
        },
        documents: DocumentStats::compute(&store.get_all::<Document>()?),
        history: HistoryStats::compute(&store.get_all::<MessageHistory>()?),
        inbox: InboxStats::compute(&store.get_all::<IncomingMessage>()?),
        audit: AuditStats::compute(&store.get_all::<AuditLog>()?, now),
        outbox: OutboxStats::compute(&store.get_all::<Message>()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseType, ParticipantRole, Priority, Relationship};
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_case_stats() {
        let now = Utc::now();
        let mut a = Case::new("JV-1", "A", CaseType::Dependency);
        a.status = CaseStatus::Active;
        a.priority = Priority::Urgent;
        a.next_hearing_date = Some(now.date_naive() + Duration::days(3));
        let mut b = Case::new("JV-2", "B", CaseType::Dependency);
        b.next_hearing_date = NaiveDate::from_ymd_opt(2000, 1, 1);
        let c = Case::new("JV-3", "C", CaseType::Neglect);

        let stats = CaseStats::compute(&[a, b, c], now);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_type["dependency"], 2);
        assert_eq!(stats.by_type["neglect"], 1);
        assert_eq!(stats.by_priority["urgent"], 1);
        assert_eq!(stats.upcoming_hearings, 1);
    }

    #[test]
    fn test_contact_stats() {
        let eligible = {
            let mut c = Contact::new("A", "A", Relationship::Mother, "+15550000001");
            c.grant_sms_consent(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
            c
        };
        let emergency = {
            let mut c = Contact::new("B", "B", Relationship::Father, "+15550000002");
            c.emergency_contact = true;
            c
        };
        let stats = ContactStats::compute(&[eligible, emergency]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.sms_eligible, 1);
        assert_eq!(stats.consented, 1);
        assert_eq!(stats.emergency, 1);
    }

    #[test]
    fn test_history_delivery_rate() {
        let row = |direction, status| MessageHistory::new(direction, "a", "b", "hi", status, 1);
        let history = vec![
            row(Direction::Outbound, DeliveryStatus::Delivered),
            row(Direction::Outbound, DeliveryStatus::Delivered),
            row(Direction::Outbound, DeliveryStatus::Failed),
            row(Direction::Outbound, DeliveryStatus::Sent),
            row(Direction::Inbound, DeliveryStatus::Received),
        ];
        let stats = HistoryStats::compute(&history);
        assert_eq!(stats.outbound, 4);
        assert_eq!(stats.inbound, 1);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.failed, 1);
        assert!((stats.delivery_rate - 50.0).abs() < f64::EPSILON);

        assert_eq!(HistoryStats::compute(&[]).delivery_rate, 0.0);
    }

    #[test]
    fn test_generate_from_store() {
        let mut store = Store::in_memory();
        let case = store.add(Case::new("JV-1", "A", CaseType::Abuse)).unwrap();
        store
            .add(Participant::new("Sam", "Lee", ParticipantRole::Child, case.id.to_string()))
            .unwrap();
        store
            .add(Participant::new("Ann", "Lee", ParticipantRole::Parent, case.id.to_string()))
            .unwrap();
        store
            .add(IncomingMessage::new("+15550000001", "+15550000000", "hi", "SM1"))
            .unwrap();

        let report = generate(&store, Utc::now()).unwrap();
        assert_eq!(report.cases.total, 1);
        assert_eq!(report.participants.total, 2);
        assert_eq!(report.participants.by_role["child"], 1);
        assert_eq!(report.inbox.unread, 1);
        assert_eq!(report.outbox, OutboxStats::default());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cases"]["byType"]["abuse"], 1);
        assert_eq!(json["history"]["deliveryRate"], 0.0);
    }
}
