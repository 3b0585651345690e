//! Staff users and per-module permissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Mutable, Record};
use crate::storage::Collection;

string_enum! {
    pub enum UserRole {
        Admin => ("admin", "Administrator"),
        Supervisor => ("supervisor", "Supervisor"),
        Caseworker => ("caseworker", "Case Worker"),
        Clerk => ("clerk", "Clerk"),
        Readonly => ("readonly", "Read Only"),
    }
}

string_enum! {
    pub enum PermissionAction {
        View => ("view", "View"),
        Create => ("create", "Create"),
        Edit => ("edit", "Edit"),
        Delete => ("delete", "Delete"),
        Export => ("export", "Export"),
    }
}

/// Modules permissions are granted on
pub const MODULES: &[&str] = &[
    "cases",
    "contacts",
    "participants",
    "messages",
    "documents",
    "inbox",
    "integrations",
    "settings",
    "audit",
    "reports",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub module: String,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_export: bool,
}

impl Permission {
    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.can_view,
            PermissionAction::Create => self.can_create,
            PermissionAction::Edit => self.can_edit,
            PermissionAction::Delete => self.can_delete,
            PermissionAction::Export => self.can_export,
        }
    }

    /// Default grants for `role` on `module`
    pub fn for_role(role: UserRole, module: &str) -> Self {
        let (view, create, edit, delete, export) = match role {
            UserRole::Admin => (true, true, true, true, true),
            UserRole::Supervisor => (true, true, true, false, true),
            UserRole::Caseworker => (true, true, true, false, false),
            UserRole::Clerk => (true, true, false, false, false),
            UserRole::Readonly => (true, false, false, false, false),
        };
        Self {
            module: module.to_string(),
            can_view: view,
            can_create: create,
            can_edit: edit,
            can_delete: delete,
            can_export: export,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// An active user with the role's default permissions on every module
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            permissions: MODULES.iter().map(|m| Permission::for_role(role, m)).collect(),
            active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the user may perform `action` on `module`.
    /// Inactive users can do nothing; admins can do everything.
    pub fn can(&self, module: &str, action: PermissionAction) -> bool {
        if !self.active {
            return false;
        }
        if self.role == UserRole::Admin {
            return true;
        }
        self.permissions
            .iter()
            .find(|p| p.module == module)
            .is_some_and(|p| p.allows(action))
    }
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_identity(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }
}

impl Mutable for User {
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
    fn test_role_permissions() {
        let clerk = User::new("jclerk", "j@court.gov", "Jo", "Clerk", UserRole::Clerk);
        assert_eq!(clerk.permissions.len(), MODULES.len());
        assert!(clerk.can("cases", PermissionAction::View));
        assert!(clerk.can("cases", PermissionAction::Create));
        assert!(!clerk.can("cases", PermissionAction::Delete));
        assert!(!clerk.can("unknown", PermissionAction::View));
    }

    #[test]
    fn test_admin_and_inactive() {
        let mut admin = User::new("root", "r@court.gov", "Ro", "Ot", UserRole::Admin);
        admin.permissions.clear();
        assert!(admin.can("anything", PermissionAction::Delete));

        admin.active = false;
        assert!(!admin.can("cases", PermissionAction::View));
    }

    #[test]
    fn test_readonly_cannot_export() {
        let user = User::new("viewer", "v@court.gov", "Vi", "Ewer", UserRole::Readonly);
        assert!(user.can("audit", PermissionAction::View));
        assert!(!user.can("audit", PermissionAction::Export));
    }
}
