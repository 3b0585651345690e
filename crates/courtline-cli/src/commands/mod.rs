//! Command handlers
//!
//! Shared plumbing for the per-entity modules: id-prefix resolution,
//! `--set key=value` patches and the generic show/update/delete flow.

pub mod audit;
pub mod case;
pub mod compliance;
pub mod config;
pub mod contact;
pub mod document;
pub mod inbox;
pub mod integration;
pub mod message;
pub mod participant;
pub mod report;
pub mod status;
pub mod twilio;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use courtline_core::audit::{diff_changes, log_audit, AuditEntry};
use courtline_core::models::{AuditAction, EntityType, Mutable, Record, Setting};
use courtline_core::validation::parse_datetime;
use courtline_core::{Store, Validate};

use crate::editor::confirm;
use crate::output::{short_id, Output, Tabular};

/// Stored records the generic handlers can manage
pub trait Managed: Mutable + Validate + Tabular {
    /// Entity type recorded in audit entries
    const ENTITY: EntityType;

    /// Short human description used in messages
    fn describe(&self) -> String;
}

/// Find a record by full id or unique id prefix
pub fn resolve<T: Record + Tabular>(store: &Store, id: &str) -> Result<T> {
    let mut matches = store.find_by_prefix::<T>(id)?;
    match matches.len() {
        0 => bail!("No {} found matching: {}", T::NOUN, id),
        1 => Ok(matches.remove(0)),
        _ => {
            eprintln!("Multiple {} match '{}':", T::NOUN, id);
            for record in &matches {
                eprintln!("  {}", record.key());
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Parse `key=value` assignments into a JSON object patch
///
/// Values that parse as JSON (numbers, booleans, null, arrays) keep their
/// type; anything else is taken as a string.
pub fn parse_assignments(assignments: &[String]) -> Result<Value> {
    let mut patch = Map::new();
    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected key=value, got '{}'", assignment))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("Empty field name in '{}'", assignment);
        }
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null | Value::Array(_))) => v,
            _ => Value::String(raw.to_string()),
        };
        patch.insert(key.to_string(), value);
    }
    Ok(Value::Object(patch))
}

/// Parse a user-supplied date or date-time (naive values are UTC)
pub fn parse_when(value: &str) -> Result<DateTime<Utc>> {
    parse_datetime(value).ok_or_else(|| {
        anyhow!(
            "Invalid date '{}'. Use YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339",
            value
        )
    })
}

/// Merge `key=value` assignments into a setting, validate and save it
pub fn set_setting<T: Setting + Validate>(store: &mut Store, assignments: &[String]) -> Result<(T, T)> {
    let before: T = store.load_setting()?;
    let patch = parse_assignments(assignments)?;
    let mut merged = serde_json::to_value(&before)?;
    if let (Value::Object(fields), Value::Object(changes)) = (&mut merged, patch) {
        fields.extend(changes);
    }
    let updated: T = serde_json::from_value(merged).context("Invalid field value")?;
    updated.validate()?;
    let after = store.save_setting(updated)?;
    Ok((before, after))
}

/// Validate a new record and store it, recording a create audit entry
pub fn create<T: Managed>(store: &mut Store, record: T, output: &Output) -> Result<T> {
    record.validate()?;
    let record = store
        .add(record)
        .with_context(|| format!("Failed to create {}", T::NOUN))?;
    log_audit(
        store,
        AuditEntry::new(
            AuditAction::Create,
            T::ENTITY,
            record.id(),
            format!("Created {}", record.describe()),
        ),
    )?;

    output.success(&format!("Created {}", record.describe()));
    output.print_record(&record);
    Ok(record)
}

pub fn show<T: Managed>(store: &mut Store, id: &str, output: &Output) -> Result<()> {
    let record: T = resolve(store, id)?;
    log_audit(
        store,
        AuditEntry::new(
            AuditAction::View,
            T::ENTITY,
            record.id(),
            format!("Viewed {}", record.describe()),
        ),
    )?;
    output.print_record(&record);
    Ok(())
}

/// Apply `--set` assignments after validating the merged result
pub fn update<T: Managed>(
    store: &mut Store,
    id: &str,
    assignments: &[String],
    output: &Output,
) -> Result<T> {
    if assignments.is_empty() {
        bail!("Nothing to update. Pass one or more --set field=value");
    }
    let before: T = resolve(store, id)?;
    let patch = parse_assignments(assignments)?;

    let mut preview = serde_json::to_value(&before)?;
    if let (Value::Object(fields), Value::Object(changes)) = (&mut preview, &patch) {
        for (k, v) in changes {
            fields.insert(k.clone(), v.clone());
        }
    }
    let preview: T = serde_json::from_value(preview).context("Invalid field value")?;
    preview.validate()?;

    let after: T = store
        .update(before.id(), &patch)?
        .ok_or_else(|| anyhow!("{} disappeared during update", before.describe()))?;
    finish_update(store, &before, &after, output)?;
    Ok(after)
}

/// Audit and report a change made by any handler
pub fn finish_update<T: Managed>(
    store: &mut Store,
    before: &T,
    after: &T,
    output: &Output,
) -> Result<()> {
    let changes = diff_changes(before, after);
    let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
    log_audit(
        store,
        AuditEntry::new(
            AuditAction::Update,
            T::ENTITY,
            after.id(),
            format!("Updated {} ({})", after.describe(), fields.join(", ")),
        )
        .with_changes(changes),
    )?;
    output.success(&format!("Updated {}", after.describe()));
    output.print_record(after);
    Ok(())
}

/// Edit a record in place with a closure, then audit the diff
pub fn edit<T: Managed>(
    store: &mut Store,
    id: &str,
    output: &Output,
    change: impl FnOnce(&mut T),
) -> Result<T> {
    let before: T = resolve(store, id)?;
    let mut draft = before.clone();
    change(&mut draft);
    draft.validate()?;

    let after: T = store
        .modify(before.id(), |r: &mut T| *r = draft)?
        .ok_or_else(|| anyhow!("{} disappeared during update", before.describe()))?;
    finish_update(store, &before, &after, output)?;
    Ok(after)
}

pub fn delete<T: Managed>(store: &mut Store, id: &str, output: &Output) -> Result<()> {
    let record: T = resolve(store, id)?;

    if output.should_prompt() {
        println!("Delete {}: {}", short_id(&record.id()), record.describe());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete::<T>(record.id())
        .with_context(|| format!("Failed to delete {}", T::NOUN))?;
    log_audit(
        store,
        AuditEntry::new(
            AuditAction::Delete,
            T::ENTITY,
            record.id(),
            format!("Deleted {}", record.describe()),
        ),
    )?;

    output.success(&format!("Deleted {}", record.describe()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtline_core::models::{AuditLog, Case, CaseStatus, CaseType};
    use serde_json::json;

    use crate::output::OutputFormat;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet, true)
    }

    #[test]
    fn test_parse_assignments() {
        let patch = parse_assignments(&[
            "status=active".to_string(),
            "syncInterval=30".to_string(),
            "enabled=true".to_string(),
            "notes=null".to_string(),
            "childrenInvolved=[\"Ana\"]".to_string(),
            "title=a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(
            patch,
            json!({
                "status": "active",
                "syncInterval": 30,
                "enabled": true,
                "notes": null,
                "childrenInvolved": ["Ana"],
                "title": "a=b",
            })
        );

        assert!(parse_assignments(&["novalue".to_string()]).is_err());
        assert!(parse_assignments(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_resolve_by_prefix() {
        let mut store = Store::in_memory();
        let case = store
            .add(Case::new("JV-2024-001", "In re Smith", CaseType::Dependency))
            .unwrap();

        let found: Case = resolve(&store, &case.id.to_string()[..6]).unwrap();
        assert_eq!(found.id, case.id);
        assert!(resolve::<Case>(&store, "zzzz").is_err());
    }

    #[test]
    fn test_update_validates_and_audits() {
        let mut store = Store::in_memory();
        let case = store
            .add(Case::new("JV-2024-001", "In re Smith", CaseType::Dependency))
            .unwrap();
        let id = case.id.to_string();

        let updated: Case =
            update(&mut store, &id, &["status=active".to_string()], &quiet()).unwrap();
        assert_eq!(updated.status, CaseStatus::Active);

        let logs: Vec<AuditLog> = store.get_all().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, AuditAction::Update);
        assert_eq!(logs[0].changes.as_ref().unwrap()[0].field, "status");

        assert!(update::<Case>(&mut store, &id, &["title=".to_string()], &quiet()).is_err());
        assert!(update::<Case>(&mut store, &id, &["status=bogus".to_string()], &quiet()).is_err());
        assert!(update::<Case>(&mut store, &id, &[], &quiet()).is_err());
    }

    #[test]
    fn test_delete_without_prompt() {
        let mut store = Store::in_memory();
        let case = store
            .add(Case::new("JV-2024-001", "In re Smith", CaseType::Dependency))
            .unwrap();
        delete::<Case>(&mut store, &case.id.to_string(), &quiet()).unwrap();
        assert!(store.get_all::<Case>().unwrap().is_empty());
    }
}
