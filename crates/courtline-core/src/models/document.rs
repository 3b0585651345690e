//! Document metadata. File contents are never stored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{contains_ci, push_unique, remove_value, Mutable, Record};
use crate::storage::Collection;

string_enum! {
    pub enum DocumentType {
        Petition => ("petition", "Petition"),
        Order => ("order", "Court Order"),
        Report => ("report", "Report"),
        Evaluation => ("evaluation", "Evaluation"),
        MedicalRecord => ("medical_record", "Medical Record"),
        Evidence => ("evidence", "Evidence"),
        Correspondence => ("correspondence", "Correspondence"),
        Other => ("other", "Other"),
    }
}

string_enum! {
    pub enum DocumentStatus {
        Active => ("active", "Active"),
        Archived => ("archived", "Archived"),
        Expired => ("expired", "Expired"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub case_id: String,
    pub docket_number: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub file_name: String,
    /// Size in bytes
    pub file_size: u64,
    pub uploaded_by: String,
    pub upload_date: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub confidential: bool,
    pub hipaa_protected: bool,
    pub ferpa_protected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        case_id: impl Into<String>,
        docket_number: impl Into<String>,
        title: impl Into<String>,
        doc_type: DocumentType,
        file_name: impl Into<String>,
        file_size: u64,
        uploaded_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            case_id: case_id.into(),
            docket_number: docket_number.into(),
            title: title.into(),
            doc_type,
            file_name: file_name.into(),
            file_size,
            uploaded_by: uploaded_by.into(),
            upload_date: now,
            tags: Vec::new(),
            confidential: false,
            hipaa_protected: false,
            ferpa_protected: false,
            expiration_date: None,
            status: DocumentStatus::Active,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Past its expiration date on `today`
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiration_date.is_some_and(|d| d < today)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        push_unique(&mut self.tags, tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        remove_value(&mut self.tags, tag)
    }

    /// Human-readable file size
    pub fn size_label(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.file_size as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} B", self.file_size)
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }

    pub fn matches(
        &self,
        query: &str,
        doc_type: Option<DocumentType>,
        status: Option<DocumentStatus>,
    ) -> bool {
        if doc_type.is_some_and(|t| t != self.doc_type) || status.is_some_and(|s| s != self.status)
        {
            return false;
        }
        let q = query.trim().to_lowercase();
        q.is_empty()
            || contains_ci(&self.title, &q)
            || contains_ci(&self.docket_number, &q)
            || contains_ci(&self.file_name, &q)
            || self.tags.iter().any(|t| contains_ci(t, &q))
    }
}

impl Record for Document {
    const COLLECTION: Collection = Collection::Documents;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for Document {
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

    fn petition() -> Document {
        Document::new(
            "case-1",
            "JV-2024-001",
            "Initial Petition",
            DocumentType::Petition,
            "petition.pdf",
            2048,
            "Clerk",
        )
    }

    #[test]
    fn test_document_filters() {
        let mut doc = petition();
        doc.add_tag("intake");

        assert!(doc.matches("petition", None, None));
        assert!(doc.matches("INTAKE", Some(DocumentType::Petition), None));
        assert!(doc.matches("jv-2024", None, Some(DocumentStatus::Active)));
        assert!(!doc.matches("", Some(DocumentType::Order), None));
        assert!(!doc.matches("", None, Some(DocumentStatus::Archived)));
    }

    #[test]
    fn test_size_label() {
        let mut doc = petition();
        assert_eq!(doc.size_label(), "2.0 KB");
        doc.file_size = 512;
        assert_eq!(doc.size_label(), "512 B");
        doc.file_size = 5 * 1024 * 1024;
        assert_eq!(doc.size_label(), "5.0 MB");
    }

    #[test]
    fn test_expiration() {
        let mut doc = petition();
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert!(!doc.is_expired_on(today));
        doc.expiration_date = NaiveDate::from_ymd_opt(2025, 1, 9);
        assert!(doc.is_expired_on(today));
    }

    #[test]
    fn test_document_type_serializes_as_type() {
        let json = serde_json::to_value(petition()).unwrap();
        assert_eq!(json["type"], "petition");
        assert_eq!(json["fileSize"], 2048);
        assert_eq!(json["hipaaProtected"], false);
    }
}
