//! Court cases

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{contains_ci, Mutable, Priority, Record};
use crate::storage::Collection;

string_enum! {
    /// Kind of proceeding
    pub enum CaseType {
        Dependency => ("dependency", "Dependency"),
        Delinquency => ("delinquency", "Delinquency"),
        Abuse => ("abuse", "Abuse/Neglect"),
        Neglect => ("neglect", "Neglect"),
        Termination => ("termination", "Termination of Parental Rights"),
        Other => ("other", "Other"),
    }
}

string_enum! {
    pub enum CaseStatus {
        Pending => ("pending", "Pending"),
        Active => ("active", "Active"),
        Closed => ("closed", "Closed"),
        Transferred => ("transferred", "Transferred"),
        Appealed => ("appealed", "Appealed"),
    }
}

/// A dependency-court case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: Uuid,
    /// Court-assigned case identifier
    pub docket_number: String,
    pub title: String,
    #[serde(rename = "type")]
    pub case_type: CaseType,
    pub status: CaseStatus,
    pub priority: Priority,
    pub filing_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hearing_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hearing_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hearing_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hearing_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_judge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_case_worker: Option<String>,
    /// Names of the children involved
    #[serde(default)]
    pub children_involved: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Create a pending, medium-priority case filed today
    pub fn new(
        docket_number: impl Into<String>,
        title: impl Into<String>,
        case_type: CaseType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            docket_number: docket_number.into(),
            title: title.into(),
            case_type,
            status: CaseStatus::Pending,
            priority: Priority::Medium,
            filing_date: now.date_naive(),
            next_hearing_date: None,
            next_hearing_time: None,
            next_hearing_location: None,
            next_hearing_type: None,
            assigned_judge: None,
            assigned_case_worker: None,
            children_involved: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the next hearing falls strictly after `today`
    pub fn has_upcoming_hearing(&self, today: NaiveDate) -> bool {
        self.next_hearing_date.is_some_and(|d| d > today)
    }

    /// Case-insensitive search over docket number, title and judge
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || contains_ci(&self.docket_number, &q)
            || contains_ci(&self.title, &q)
            || self
                .assigned_judge
                .as_deref()
                .is_some_and(|j| contains_ci(j, &q))
    }
}

impl Record for Case {
    const COLLECTION: Collection = Collection::Cases;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for Case {
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
    fn test_case_new() {
        let case = Case::new("JV-2024-001", "In re Smith Children", CaseType::Dependency);
        assert_eq!(case.docket_number, "JV-2024-001");
        assert_eq!(case.status, CaseStatus::Pending);
        assert_eq!(case.priority, Priority::Medium);
        assert!(case.children_involved.is_empty());
        assert_eq!(case.created_at, case.updated_at);
    }

    #[test]
    fn test_case_matches() {
        let mut case = Case::new("JV-2024-001", "In re Smith Children", CaseType::Dependency);
        case.assigned_judge = Some("Hon. Rivera".to_string());

        assert!(case.matches("jv-2024"));
        assert!(case.matches("SMITH"));
        assert!(case.matches("rivera"));
        assert!(case.matches(""));
        assert!(!case.matches("johnson"));
    }

    #[test]
    fn test_upcoming_hearing() {
        let mut case = Case::new("JV-1", "Title", CaseType::Other);
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(!case.has_upcoming_hearing(today));

        case.next_hearing_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert!(!case.has_upcoming_hearing(today));

        case.next_hearing_date = NaiveDate::from_ymd_opt(2025, 3, 2);
        assert!(case.has_upcoming_hearing(today));
    }

    #[test]
    fn test_case_serializes_camel_case() {
        let case = Case::new("JV-1", "Title", CaseType::Termination);
        let json = serde_json::to_value(&case).unwrap();

        assert_eq!(json["docketNumber"], "JV-1");
        assert_eq!(json["type"], "termination");
        assert!(json.get("nextHearingDate").is_none());
        assert!(json.get("createdAt").is_some());

        let back: Case = serde_json::from_value(json).unwrap();
        assert_eq!(back, case);
    }
}
