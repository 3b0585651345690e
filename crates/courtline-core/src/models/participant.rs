//! Case participants

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{contains_ci, Mutable, Record};
use crate::storage::Collection;

string_enum! {
    pub enum ParticipantRole {
        Child => ("child", "Child"),
        Parent => ("parent", "Parent"),
        Guardian => ("guardian", "Guardian"),
        Attorney => ("attorney", "Attorney"),
        Caseworker => ("caseworker", "Case Worker"),
        FosterParent => ("foster_parent", "Foster Parent"),
        Therapist => ("therapist", "Therapist"),
        Advocate => ("advocate", "Advocate"),
        Other => ("other", "Other"),
    }
}

/// Someone involved in a case (child, parent, attorney, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    pub role: ParticipantRole,
    pub case_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attorney_bar_number: Option<String>,
    pub court_appointed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_needs: Option<String>,
    pub language_preference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: ParticipantRole,
        case_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: None,
            role,
            case_id: case_id.into(),
            contact_phone: None,
            contact_email: None,
            attorney_bar_number: None,
            court_appointed: false,
            special_needs: None,
            language_preference: "en".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `today`, if the birth date is known
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| today.years_since(dob))
    }

    /// Name search combined with an optional role filter
    pub fn matches(&self, query: &str, role: Option<ParticipantRole>) -> bool {
        if role.is_some_and(|r| r != self.role) {
            return false;
        }
        let q = query.trim().to_lowercase();
        q.is_empty() || contains_ci(&self.full_name(), &q)
    }
}

impl Record for Participant {
    const COLLECTION: Collection = Collection::Participants;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for Participant {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_matches_with_role_filter() {
        let p = Participant::new("Ana", "Smith", ParticipantRole::Child, "case-1");

        assert!(p.matches("ana", None));
        assert!(p.matches("", Some(ParticipantRole::Child)));
        assert!(!p.matches("ana", Some(ParticipantRole::Attorney)));
        assert!(!p.matches("jones", None));
    }

    #[test]
    fn test_age_on() {
        let mut p = Participant::new("Ana", "Smith", ParticipantRole::Child, "case-1");
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(p.age_on(today), None);

        p.date_of_birth = NaiveDate::from_ymd_opt(2015, 6, 2);
        assert_eq!(p.age_on(today), Some(9));

        p.date_of_birth = NaiveDate::from_ymd_opt(2015, 6, 1);
        assert_eq!(p.age_on(today), Some(10));
    }

    #[test]
    fn test_role_parse_accepts_dashes() {
        assert_eq!(
            "foster-parent".parse::<ParticipantRole>(),
            Ok(ParticipantRole::FosterParent)
        );
        assert_eq!(ParticipantRole::Caseworker.label(), "Case Worker");
    }
}
