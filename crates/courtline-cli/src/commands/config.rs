//! Config command handlers

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use courtline_core::{BackendKind, Config};

use crate::output::{Output, OutputFormat};

const KEYS: &str = "data_dir, backend, user_id, user_name, simulate_latency, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backend": config.backend,
                    "user_id": config.user_id,
                    "user_name": config.user_name,
                    "simulate_latency": config.simulate_latency,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:         {}", config.data_dir.display());
            println!("  backend:          {}", config.backend);
            println!("  user_id:          {}", config.user_id);
            println!("  user_name:        {}", config.user_name);
            println!("  simulate_latency: {}", config.simulate_latency);
            println!(
                "  log_file:         {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("(default: {})", config.log_path().display()))
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Apply one `key = value` change to a config
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let unset = value.is_empty() || value == "none";
    match key {
        "data_dir" => {
            if value.is_empty() {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.into();
        }
        "backend" => {
            config.backend = value.parse::<BackendKind>().map_err(|e| anyhow!(e))?;
        }
        "user_id" => {
            if value.trim().is_empty() {
                bail!("user_id cannot be empty");
            }
            config.user_id = value.to_string();
        }
        "user_name" => {
            if value.trim().is_empty() {
                bail!("user_name cannot be empty");
            }
            config.user_name = value.to_string();
        }
        "simulate_latency" => {
            config.simulate_latency = value
                .parse()
                .context("Invalid value for simulate_latency. Use 'true' or 'false'.")?;
        }
        "log_file" => {
            config.log_file = (!unset).then(|| value.into());
        }
        _ => {
            bail!("Unknown configuration key: '{}'\nValid keys: {}", key, KEYS);
        }
    }
    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
