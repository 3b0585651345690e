//! Compliance settings, retention policies and staff users

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use courtline_core::audit::{diff_changes, log_audit, AuditEntry};
use courtline_core::models::{
    AuditAction, ComplianceSettings, DataRetentionPolicy, EntityType, PermissionAction, Permission,
    User, UserRole, MODULES,
};
use courtline_core::Store;

use super::{edit, resolve, set_setting, Managed};
use crate::output::Output;

impl Managed for DataRetentionPolicy {
    const ENTITY: EntityType = EntityType::Setting;

    fn describe(&self) -> String {
        format!(
            "retention policy for {} ({} days)",
            self.entity_type, self.retention_period_days
        )
    }
}

impl Managed for User {
    const ENTITY: EntityType = EntityType::User;

    fn describe(&self) -> String {
        format!("user {} ({})", self.username, self.role.label())
    }
}

#[derive(Subcommand)]
pub enum ComplianceCommands {
    /// Show or change compliance settings
    #[command(subcommand)]
    Settings(SettingsCommands),
    /// Manage data-retention policies
    #[command(subcommand)]
    Policies(PolicyCommands),
    /// Manage staff users and permissions
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    Show,
    /// Change settings, e.g. dataRetentionDays=3650 requireConsentForSms=false
    Set {
        #[arg(value_name = "FIELD=VALUE", required = true)]
        assignments: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    #[command(alias = "create")]
    Add {
        /// Kind of record the policy covers, e.g. cases
        entity_type: String,
        /// Days to keep records
        days: u32,
        #[arg(long)]
        auto_delete: bool,
        /// Delete without archiving first
        #[arg(long)]
        no_archive: bool,
        /// Record ids exempt from the policy (repeatable)
        #[arg(long = "except")]
        exceptions: Vec<String>,
    },
    #[command(alias = "ls")]
    List,
    /// Update fields, e.g. --set retentionPeriodDays=365
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(alias = "create")]
    Add(NewUser),
    #[command(alias = "ls")]
    List,
    Show { id: String },
    /// Update fields, e.g. --set active=false
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Grant or revoke one action on one module
    Permit {
        id: String,
        module: String,
        action: PermissionAction,
        #[arg(long)]
        revoke: bool,
    },
    /// Check whether a user may perform an action
    Check {
        id: String,
        module: String,
        action: PermissionAction,
    },
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Args)]
pub struct NewUser {
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long, default_value = "readonly")]
    role: UserRole,
}

fn check_module(module: &str) -> Result<()> {
    if !MODULES.contains(&module) {
        bail!("Unknown module '{}'. Expected one of: {}", module, MODULES.join(", "));
    }
    Ok(())
}

fn set_permission(user: &mut User, module: &str, action: PermissionAction, allowed: bool) {
    let index = match user.permissions.iter().position(|p| p.module == module) {
        Some(index) => index,
        None => {
            user.permissions.push(Permission::for_role(UserRole::Readonly, module));
            user.permissions.len() - 1
        }
    };
    let permission = &mut user.permissions[index];
    match action {
        PermissionAction::View => permission.can_view = allowed,
        PermissionAction::Create => permission.can_create = allowed,
        PermissionAction::Edit => permission.can_edit = allowed,
        PermissionAction::Delete => permission.can_delete = allowed,
        PermissionAction::Export => permission.can_export = allowed,
    }
}

fn run_settings(command: SettingsCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        SettingsCommands::Show => {
            let settings: ComplianceSettings = store.load_setting()?;
            output.print_value(&settings, |s| {
                let on = |b: bool| if b { "on" } else { "off" };
                println!("HIPAA:                {}", on(s.hipaa_enabled));
                println!("FERPA:                {}", on(s.ferpa_enabled));
                println!("Encryption:           {}", on(s.encryption_enabled));
                println!("SMS consent required: {}", on(s.require_consent_for_sms));
                println!("Data retention:       {} days", s.data_retention_days);
                println!("Audit retention:      {} days", s.audit_log_retention_days);
                println!("Auto-delete expired:  {}", on(s.auto_delete_expired));
                if let Some(url) = &s.privacy_policy_url {
                    println!("Privacy policy:       {}", url);
                }
                if let Some(url) = &s.terms_of_service_url {
                    println!("Terms of service:     {}", url);
                }
            });
        }
        SettingsCommands::Set { assignments } => {
            let (before, after) = set_setting::<ComplianceSettings>(store, &assignments)?;
            let changes = diff_changes(&before, &after);
            let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
            log_audit(
                store,
                AuditEntry::new(
                    AuditAction::Update,
                    EntityType::Setting,
                    "compliance-settings",
                    format!("Updated compliance settings ({})", fields.join(", ")),
                )
                .with_changes(changes),
            )?;
            output.success("Saved compliance settings");
        }
    }
    Ok(())
}

fn run_policies(command: PolicyCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        PolicyCommands::Add {
            entity_type,
            days,
            auto_delete,
            no_archive,
            exceptions,
        } => {
            let mut policy = DataRetentionPolicy::new(entity_type, days);
            policy.auto_delete = auto_delete;
            policy.archive_before_delete = !no_archive;
            policy.exceptions = exceptions;
            super::create(store, policy, output)?;
        }
        PolicyCommands::List => output.print_records(&store.get_all::<DataRetentionPolicy>()?),
        PolicyCommands::Update { id, set } => {
            super::update::<DataRetentionPolicy>(store, &id, &set, output)?;
        }
        PolicyCommands::Delete { id } => super::delete::<DataRetentionPolicy>(store, &id, output)?,
    }
    Ok(())
}

fn run_users(command: UserCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        UserCommands::Add(new) => {
            let taken = store
                .get_all::<User>()?
                .iter()
                .any(|u| u.username.eq_ignore_ascii_case(&new.username));
            if taken {
                bail!("Username '{}' is already taken", new.username);
            }
            let user = User::new(new.username, new.email, new.first_name, new.last_name, new.role);
            super::create(store, user, output)?;
        }
        UserCommands::List => output.print_records(&store.get_all::<User>()?),
        UserCommands::Show { id } => super::show::<User>(store, &id, output)?,
        UserCommands::Update { id, set } => {
            super::update::<User>(store, &id, &set, output)?;
        }
        UserCommands::Permit {
            id,
            module,
            action,
            revoke,
        } => {
            check_module(&module)?;
            edit(store, &id, output, |u: &mut User| {
                set_permission(u, &module, action, !revoke)
            })?;
        }
        UserCommands::Check { id, module, action } => {
            check_module(&module)?;
            let user: User = resolve(store, &id)?;
            let allowed = user.can(&module, action);
            output.print_value(&serde_json::json!({ "allowed": allowed }), |_| {
                println!(
                    "{} {} {} {}",
                    user.username,
                    if allowed { "may" } else { "may not" },
                    action.as_str(),
                    module
                );
            });
            if output.is_quiet() {
                println!("{}", allowed);
            }
        }
        UserCommands::Delete { id } => super::delete::<User>(store, &id, output)?,
    }
    Ok(())
}

pub fn run(command: ComplianceCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        ComplianceCommands::Settings(command) => run_settings(command, store, output),
        ComplianceCommands::Policies(command) => run_policies(command, store, output),
        ComplianceCommands::Users(command) => run_users(command, store, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet, true)
    }

    #[test]
    fn test_settings_minimums() {
        let mut store = Store::in_memory();
        let too_short = run_settings(
            SettingsCommands::Set { assignments: vec!["dataRetentionDays=10".to_string()] },
            &mut store,
            &quiet(),
        );
        assert!(too_short.is_err());

        run_settings(
            SettingsCommands::Set { assignments: vec!["requireConsentForSms=false".to_string()] },
            &mut store,
            &quiet(),
        )
        .unwrap();
        let settings: ComplianceSettings = store.load_setting().unwrap();
        assert!(!settings.require_consent_for_sms);
        assert!(settings.hipaa_enabled);
        assert!(settings.updated_at.is_some());
    }

    #[test]
    fn test_permit_and_check() {
        let mut store = Store::in_memory();
        let new = NewUser {
            username: "clerk1".to_string(),
            email: "clerk1@court.example.gov".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Reyes".to_string(),
            role: UserRole::Clerk,
        };
        run_users(UserCommands::Add(new), &mut store, &quiet()).unwrap();
        let user = store.get_all::<User>().unwrap().remove(0);
        assert!(!user.can("cases", PermissionAction::Edit));

        run_users(
            UserCommands::Permit {
                id: user.id.to_string(),
                module: "cases".to_string(),
                action: PermissionAction::Edit,
                revoke: false,
            },
            &mut store,
            &quiet(),
        )
        .unwrap();
        let stored: User = store.get_by_id(user.id).unwrap().unwrap();
        assert!(stored.can("cases", PermissionAction::Edit));
        assert!(!stored.can("contacts", PermissionAction::Edit));

        let unknown = run_users(
            UserCommands::Check {
                id: user.id.to_string(),
                module: "payroll".to_string(),
                action: PermissionAction::View,
            },
            &mut store,
            &quiet(),
        );
        assert!(unknown.is_err());
    }

    #[test]
    fn test_duplicate_username() {
        let mut store = Store::in_memory();
        store
            .add(User::new("admin", "a@example.gov", "A", "B", UserRole::Admin))
            .unwrap();
        let new = NewUser {
            username: "Admin".to_string(),
            email: "b@example.gov".to_string(),
            first_name: "C".to_string(),
            last_name: "D".to_string(),
            role: UserRole::Readonly,
        };
        assert!(run_users(UserCommands::Add(new), &mut store, &quiet()).is_err());
    }
}
