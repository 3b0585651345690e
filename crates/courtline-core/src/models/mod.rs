//! Data models for Courtline
//!
//! Every stored entity is a flat record keyed by a generated UUID. Records
//! serialize with camelCase field names; that is the on-disk layout.
//!
//! - [`Record`]: anything that lives in a named collection
//! - [`Mutable`]: records that can be updated and deleted (they carry
//!   `updatedAt`). Append-only records (history, audit, integration logs)
//!   only implement [`Record`].
//! - [`Setting`]: singleton settings objects

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::storage::Collection;

/// Defines a string-valued enum with its stored value and display label.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => ($value:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( #[serde(rename = $value)] $variant ),+
        }

        impl $name {
            /// All variants in display order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored value
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Human-readable label
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase().replace('-', "_");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let expected: Vec<_> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("Invalid value '{}'. Expected one of: {}", s, expected.join(", "))
                    })
            }
        }
    };
}

mod audit;
mod case;
mod compliance;
mod contact;
mod document;
mod inbox;
mod integration;
mod message;
mod participant;
mod twilio;
mod user;

pub use audit::{AuditAction, AuditLog, EntityType, FieldChange, Severity};
pub use case::{Case, CaseStatus, CaseType};
pub use compliance::{ComplianceSettings, DataRetentionPolicy, DEFAULT_RETENTION_DAYS};
pub use contact::{Contact, PreferredContact, Relationship};
pub use document::{Document, DocumentStatus, DocumentType};
pub use inbox::{IncomingMessage, InboxStatus};
pub use integration::{
    ConnectionStatus, FieldMapping, IntegrationAction, IntegrationConfig, IntegrationLog,
    IntegrationType, RunStatus,
};
pub use message::{DeliveryStatus, Direction, Message, MessageHistory, MessageStatus, MessageType};
pub use participant::{Participant, ParticipantRole};
pub use twilio::{Capabilities, MessageTemplate, PhoneNumber, PhoneNumberType, TwilioConfig};
pub use user::{Permission, PermissionAction, User, UserRole, MODULES};

string_enum! {
    /// Priority shared by cases, messages and inbox items
    pub enum Priority {
        Low => ("low", "Low"),
        Medium => ("medium", "Medium"),
        High => ("high", "High"),
        Urgent => ("urgent", "Urgent"),
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A record stored in a named collection
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Collection this record type lives in
    const COLLECTION: Collection;

    /// Unique identifier
    fn id(&self) -> Uuid;

    /// Give the record a fresh id and creation timestamps
    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>);
}

/// A record that can be updated in place and deleted
pub trait Mutable: Record {
    fn updated_at(&self) -> DateTime<Utc>;

    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

/// A singleton settings object stored under its own key
pub trait Setting: Serialize + DeserializeOwned + Default + Clone {
    const COLLECTION: Collection;

    /// Stamp the modification time
    fn touch(&mut self, now: DateTime<Utc>);
}

/// A timestamp strictly later than `previous`
///
/// Normally just `now`; bumps by one microsecond when the clock has not
/// advanced since the last write.
pub fn later_than(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Case-insensitive substring test used by the `matches` helpers
pub(crate) fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Add a tag if not present. Returns true when the list changed.
pub(crate) fn push_unique(tags: &mut Vec<String>, tag: impl Into<String>) -> bool {
    let tag = tag.into();
    let tag = tag.trim();
    if tag.is_empty() || tags.iter().any(|t| t == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

/// Remove a tag. Returns true when the list changed.
pub(crate) fn remove_value(tags: &mut Vec<String>, tag: &str) -> bool {
    match tags.iter().position(|t| t == tag) {
        Some(pos) => {
            tags.remove(pos);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parse_and_display() {
        assert_eq!("urgent".parse::<Priority>(), Ok(Priority::Urgent));
        assert_eq!(" HIGH ".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(Priority::Low.to_string(), "low");
        assert_eq!(Priority::Medium.label(), "Medium");

        let err = "critical".parse::<Priority>().unwrap_err();
        assert!(err.contains("low, medium, high, urgent"));
    }

    #[test]
    fn test_later_than() {
        let t = Utc::now();
        assert!(later_than(t, t) > t);
        assert!(later_than(t, t - Duration::seconds(5)) > t);

        let future = t + Duration::seconds(5);
        assert_eq!(later_than(t, future), future);
    }

    #[test]
    fn test_tag_helpers() {
        let mut tags = vec!["urgent".to_string()];
        assert!(!push_unique(&mut tags, "urgent"));
        assert!(!push_unique(&mut tags, "   "));
        assert!(push_unique(&mut tags, " follow-up "));
        assert_eq!(tags, vec!["urgent", "follow-up"]);

        assert!(remove_value(&mut tags, "urgent"));
        assert!(!remove_value(&mut tags, "urgent"));
        assert_eq!(tags, vec!["follow-up"]);
    }
}
