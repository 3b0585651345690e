//! Integration command handlers
//!
//! Runs are simulated; see [`courtline_core::integration`].

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use serde_json::Value;

use courtline_core::integration::{map_fields, RunOutcome, Simulator};
use courtline_core::models::{
    EntityType, FieldMapping, IntegrationConfig, IntegrationLog, IntegrationType,
};
use courtline_core::Store;

use super::{edit, resolve, Managed};
use crate::output::Output;

impl Managed for IntegrationConfig {
    const ENTITY: EntityType = EntityType::Setting;

    fn describe(&self) -> String {
        format!("integration '{}' ({})", self.name, self.integration_type)
    }
}

#[derive(Subcommand)]
pub enum IntegrationCommands {
    /// Configure a new integration
    #[command(alias = "create")]
    Add(NewIntegration),
    #[command(alias = "ls")]
    List,
    Show { id: String },
    /// Update fields, e.g. --set enabled=true --set syncInterval=30
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Check the connection settings
    Test { id: String },
    Sync { id: String },
    Import { id: String },
    Export { id: String },
    /// Sync every auto-sync integration whose interval has elapsed
    SyncDue,
    /// Show run history, newest first
    Logs {
        /// Only runs of this integration
        id: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Add a field mapping
    Map {
        id: String,
        source: String,
        target: String,
        /// uppercase, lowercase, trim, date, number or boolean
        #[arg(long)]
        transform: Option<String>,
        #[arg(long)]
        required: bool,
    },
    /// Apply the field mappings to a JSON object and print the result
    Apply {
        id: String,
        /// JSON object, e.g. '{"caseNo":" jv-1 "}'
        record: String,
    },
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Args)]
pub struct NewIntegration {
    name: String,
    #[arg(long = "type")]
    integration_type: IntegrationType,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    username: Option<String>,
    /// Minutes between automatic syncs
    #[arg(long, default_value_t = 60)]
    interval: u32,
    #[arg(long)]
    enabled: bool,
    #[arg(long)]
    auto_sync: bool,
}

impl NewIntegration {
    fn into_config(self) -> IntegrationConfig {
        let mut config = IntegrationConfig::new(self.integration_type, self.name);
        config.endpoint = self.endpoint;
        config.api_key = self.api_key;
        config.username = self.username;
        config.sync_interval = self.interval;
        config.enabled = self.enabled;
        config.auto_sync = self.auto_sync;
        config
    }
}

fn print_outcome(outcome: &RunOutcome, output: &Output) {
    let log = &outcome.log;
    if outcome.succeeded() {
        output.success(&format!(
            "{}: {} ({} records)",
            outcome.integration.name, log.message, log.records_processed
        ));
    } else {
        output.warn(&format!("{}: {}", outcome.integration.name, log.message));
    }
    if output.is_json() || output.is_quiet() {
        output.print_record(log);
    }
}

pub async fn run(command: IntegrationCommands, store: &mut Store, output: &Output) -> Result<()> {
    let mut simulator = Simulator::new();
    match command {
        IntegrationCommands::Add(new) => {
            super::create(store, new.into_config(), output)?;
        }
        IntegrationCommands::List => {
            output.print_records(&store.get_all::<IntegrationConfig>()?);
        }
        IntegrationCommands::Show { id } => super::show::<IntegrationConfig>(store, &id, output)?,
        IntegrationCommands::Update { id, set } => {
            super::update::<IntegrationConfig>(store, &id, &set, output)?;
        }
        IntegrationCommands::Test { id } => {
            let config: IntegrationConfig = resolve(store, &id)?;
            output.message(&format!("Testing {}...", config.name));
            print_outcome(&simulator.test_connection(store, config.id).await?, output);
        }
        IntegrationCommands::Sync { id } => {
            let config: IntegrationConfig = resolve(store, &id)?;
            output.message(&format!("Syncing {}...", config.name));
            print_outcome(&simulator.sync(store, config.id).await?, output);
        }
        IntegrationCommands::Import { id } => {
            let config: IntegrationConfig = resolve(store, &id)?;
            print_outcome(&simulator.import(store, config.id).await?, output);
        }
        IntegrationCommands::Export { id } => {
            let config: IntegrationConfig = resolve(store, &id)?;
            print_outcome(&simulator.export(store, config.id).await?, output);
        }
        IntegrationCommands::SyncDue => {
            let outcomes = simulator.sync_due(store, Utc::now()).await?;
            if outcomes.is_empty() {
                output.message("No integrations due for sync.");
            }
            for outcome in &outcomes {
                print_outcome(outcome, output);
            }
        }
        IntegrationCommands::Logs { id, limit } => {
            let only = id
                .map(|id| resolve::<IntegrationConfig>(store, &id).map(|c| c.id))
                .transpose()?;
            // stored newest first
            let mut logs: Vec<IntegrationLog> = store
                .get_all::<IntegrationLog>()?
                .into_iter()
                .filter(|l| only.map_or(true, |id| l.integration_id == Some(id)))
                .collect();
            if let Some(limit) = limit {
                logs.truncate(limit);
            }
            output.print_records(&logs);
        }
        IntegrationCommands::Map {
            id,
            source,
            target,
            transform,
            required,
        } => {
            let mut mapping = FieldMapping::new(source, target);
            mapping.required = required;
            if let Some(transform) = transform {
                mapping = mapping.with_transformation(transform);
            }
            edit(store, &id, output, |c: &mut IntegrationConfig| {
                let mappings = c.field_mappings.get_or_insert_with(Vec::new);
                mappings.retain(|m| m.source_field != mapping.source_field);
                mappings.push(mapping);
            })?;
        }
        IntegrationCommands::Apply { id, record } => {
            let config: IntegrationConfig = resolve(store, &id)?;
            let value: Value = serde_json::from_str(&record).context("Record is not valid JSON")?;
            let Value::Object(source) = value else {
                bail!("Record must be a JSON object");
            };
            let mappings = config
                .field_mappings
                .as_deref()
                .ok_or_else(|| anyhow!("{} has no field mappings", config.name))?;
            if let Some(missing) = mappings
                .iter()
                .find(|m| m.required && !source.contains_key(&m.source_field))
            {
                bail!("Required field missing: {}", missing.source_field);
            }
            let mapped = Value::Object(map_fields(&source, mappings));
            output.print_value(&mapped, |v| {
                println!("{}", serde_json::to_string_pretty(v).unwrap_or_default())
            });
        }
        IntegrationCommands::Delete { id } => super::delete::<IntegrationConfig>(store, &id, output)?,
    }
    Ok(())
}
