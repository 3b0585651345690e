//! Courtline CLI
//!
//! Command-line interface for Courtline: dependency-court cases, contacts
//! and SMS outreach.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use courtline_core::models::Direction;
use courtline_core::{Config, StorageError, Store};

mod commands;
mod editor;
mod output;
mod tui;

use commands::audit::AuditCommands;
use commands::case::CaseCommands;
use commands::compliance::ComplianceCommands;
use commands::contact::ContactCommands;
use commands::document::DocumentCommands;
use commands::inbox::InboxCommands;
use commands::integration::IntegrationCommands;
use commands::message::MessageCommands;
use commands::participant::ParticipantCommands;
use commands::twilio::TwilioCommands;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "courtline")]
#[command(about = "Courtline - dependency court case and SMS management")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the read-only dashboard (default)
    Dashboard,
    /// Manage cases
    #[command(subcommand)]
    Case(CaseCommands),
    /// Manage contacts
    #[command(subcommand)]
    Contact(ContactCommands),
    /// Manage case participants
    #[command(subcommand)]
    Participant(ParticipantCommands),
    /// Manage case documents
    #[command(subcommand)]
    Document(DocumentCommands),
    /// Schedule and send SMS
    #[command(subcommand, alias = "outbox")]
    Message(MessageCommands),
    /// Show sent and received SMS
    History {
        /// Match phone number or body
        #[arg(default_value = "")]
        query: String,
        #[arg(short, long)]
        direction: Option<Direction>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Work incoming SMS
    #[command(subcommand)]
    Inbox(InboxCommands),
    /// Search and export the audit trail
    #[command(subcommand)]
    Audit(AuditCommands),
    /// Manage external-system integrations
    #[command(subcommand)]
    Integration(IntegrationCommands),
    /// SMS provider settings, numbers and templates
    #[command(subcommand)]
    Twilio(TwilioCommands),
    /// Compliance settings, retention policies and users
    #[command(subcommand)]
    Compliance(ComplianceCommands),
    /// Summary statistics
    Report,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show storage location and record counts
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, backend, user_id, user_name, simulate_latency, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

/// Log to stderr, filtered by COURTLINE_LOG (default warn)
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("COURTLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet), cli.yes);
    let config_path = cli.config.as_ref();

    let command = match cli.command {
        // Dashboard (default when no command given) sets up its own file logging
        None | Some(Commands::Dashboard) => {
            let config = Config::load_with_cli_override(config_path)
                .context("Failed to load configuration")?;
            return tui::run(config).await;
        }
        Some(command) => command,
    };

    init_logging();

    // Commands that don't need the store
    if let Commands::Config { command } = command {
        return handle_config_command(command, config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let result = match Store::open_with_config(config) {
        Ok(mut store) => run_command(command, &mut store, &output).await,
        Err(err) => Err(err),
    };

    if let Err(err) = &result {
        print_storage_hint(err);
    }
    result
}

async fn run_command(command: Commands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        Commands::Dashboard | Commands::Config { .. } => unreachable!(), // Handled in main
        Commands::Case(command) => commands::case::run(command, store, output),
        Commands::Contact(command) => commands::contact::run(command, store, output),
        Commands::Participant(command) => commands::participant::run(command, store, output),
        Commands::Document(command) => commands::document::run(command, store, output),
        Commands::Message(command) => commands::message::run(command, store, output),
        Commands::History {
            query,
            direction,
            limit,
        } => commands::message::history(store, &query, direction, limit, output),
        Commands::Inbox(command) => commands::inbox::run(command, store, output),
        Commands::Audit(command) => commands::audit::run(command, store, output),
        Commands::Integration(command) => {
            commands::integration::run(command, store, output).await
        }
        Commands::Twilio(command) => commands::twilio::run(command, store, output),
        Commands::Compliance(command) => commands::compliance::run(command, store, output),
        Commands::Report => commands::report::run(store, output),
        Commands::Status => commands::status::show(store, output),
    }
}

/// Print the recovery hint for a storage failure anywhere in the error chain
fn print_storage_hint(err: &anyhow::Error) {
    let hint = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion);
    if let Some(hint) = hint {
        eprintln!("hint: {}", hint);
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
