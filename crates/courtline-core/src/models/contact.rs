//! Contacts who receive SMS notifications

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{contains_ci, push_unique, remove_value, Mutable, Record};
use crate::storage::Collection;

string_enum! {
    /// Relationship to the child or children in the case
    pub enum Relationship {
        Mother => ("mother", "Mother"),
        Father => ("father", "Father"),
        Guardian => ("guardian", "Legal Guardian"),
        FosterParent => ("foster_parent", "Foster Parent"),
        Relative => ("relative", "Relative"),
        Other => ("other", "Other"),
    }
}

string_enum! {
    pub enum PreferredContact {
        Sms => ("sms", "SMS"),
        Phone => ("phone", "Phone"),
        Email => ("email", "Email"),
    }
}

/// A person the court communicates with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub relationship: Relationship,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub preferred_contact: PreferredContact,
    /// Consent to receive SMS; gates outbound messages
    pub sms_consent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_date: Option<NaiveDate>,
    pub language: String,
    pub needs_interpreter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    pub emergency_contact: bool,
    /// Case ids (unchecked)
    #[serde(default)]
    pub linked_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Create an English-speaking contact who prefers SMS but has not consented yet
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        relationship: Relationship,
        phone_number: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            relationship,
            phone_number: phone_number.into(),
            alternate_phone: None,
            email: None,
            preferred_contact: PreferredContact::Sms,
            sms_consent: false,
            consent_date: None,
            language: "en".to_string(),
            needs_interpreter: false,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            emergency_contact: false,
            linked_cases: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Record SMS consent given on `date`
    pub fn grant_sms_consent(&mut self, date: NaiveDate) {
        self.sms_consent = true;
        self.consent_date = Some(date);
    }

    /// Prefers SMS and has consented to it
    pub fn is_sms_eligible(&self) -> bool {
        self.preferred_contact == PreferredContact::Sms && self.sms_consent
    }

    pub fn link_case(&mut self, case_id: impl Into<String>) -> bool {
        push_unique(&mut self.linked_cases, case_id)
    }

    pub fn unlink_case(&mut self, case_id: &str) -> bool {
        remove_value(&mut self.linked_cases, case_id)
    }

    /// Whether `phone` is one of this contact's numbers, ignoring formatting
    pub fn has_phone(&self, phone: &str) -> bool {
        let wanted = digits(phone);
        if wanted.is_empty() {
            return false;
        }
        std::iter::once(&self.phone_number)
            .chain(self.alternate_phone.as_ref())
            .any(|p| same_number(&digits(p), &wanted))
    }

    /// Case-insensitive search over name, phone and email
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || contains_ci(&self.full_name(), &q)
            || self.phone_number.contains(&q)
            || self.email.as_deref().is_some_and(|e| contains_ci(e, &q))
    }
}

fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Compare digit strings, tolerating a leading US country code on one side
fn same_number(a: &str, b: &str) -> bool {
    a == b || a.strip_prefix('1') == Some(b) || b.strip_prefix('1') == Some(a)
}

impl Record for Contact {
    const COLLECTION: Collection = Collection::Contacts;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for Contact {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
