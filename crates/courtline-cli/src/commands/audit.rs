//! Audit log command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use courtline_core::audit::{export_json, log_audit, search, AuditEntry, AuditQuery};
use courtline_core::models::{AuditAction, EntityType, Severity};
use courtline_core::Store;

use super::parse_when;
use crate::output::Output;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// List audit entries, newest first
    #[command(alias = "ls")]
    List(Filters),
    /// Write matching entries as a JSON array
    Export {
        #[command(flatten)]
        filters: Filters,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
pub struct Filters {
    /// Search user, description or entity id
    #[arg(short, long, default_value = "")]
    query: String,
    #[arg(long)]
    action: Option<AuditAction>,
    #[arg(long)]
    entity: Option<EntityType>,
    #[arg(long)]
    severity: Option<Severity>,
    /// Earliest timestamp (date or date-time)
    #[arg(long)]
    since: Option<String>,
    /// Latest timestamp (date or date-time)
    #[arg(long)]
    until: Option<String>,
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

impl Filters {
    fn into_query(self) -> Result<AuditQuery> {
        Ok(AuditQuery {
            text: self.query,
            action: self.action,
            entity_type: self.entity,
            severity: self.severity,
            since: self.since.as_deref().map(parse_when).transpose()?,
            until: self.until.as_deref().map(parse_when).transpose()?,
            limit: self.limit,
        })
    }
}

pub fn run(command: AuditCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        AuditCommands::List(filters) => {
            let logs = search(store, &filters.into_query()?)?;
            output.print_records(&logs);
        }
        AuditCommands::Export {
            filters,
            output: path,
        } => {
            let logs = search(store, &filters.into_query()?)?;
            let json = export_json(&logs)?;
            match &path {
                Some(path) => std::fs::write(path, &json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
            log_audit(
                store,
                AuditEntry::new(
                    AuditAction::Export,
                    EntityType::Setting,
                    "audit-logs",
                    format!("Exported {} audit entries", logs.len()),
                )
                .with_severity(Severity::Warning),
            )?;
            if let Some(path) = path {
                output.success(&format!("Exported {} entries to {}", logs.len(), path.display()));
            }
        }
    }
    Ok(())
}
