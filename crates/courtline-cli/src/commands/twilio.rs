//! SMS provider settings, the sending number pool and message templates

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use courtline_core::audit::{diff_changes, log_audit, AuditEntry};
use courtline_core::messaging::{
    calculate_message_segments, extract_variables_from_template, template_variables,
};
use courtline_core::models::{
    AuditAction, Case, Contact, EntityType, MessageTemplate, PhoneNumber, PhoneNumberType,
    TwilioConfig,
};
use courtline_core::outbox::{render_template, set_primary_number};
use courtline_core::Store;

use super::{resolve, set_setting, Managed};
use crate::output::Output;

impl Managed for PhoneNumber {
    const ENTITY: EntityType = EntityType::Setting;

    fn describe(&self) -> String {
        format!("number {} ({})", self.phone_number, self.friendly_name)
    }
}

impl Managed for MessageTemplate {
    const ENTITY: EntityType = EntityType::Setting;

    fn describe(&self) -> String {
        format!("template '{}'", self.name)
    }
}

#[derive(Subcommand)]
pub enum TwilioCommands {
    /// Show or change the provider account settings
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Manage the sending number pool
    #[command(subcommand)]
    Numbers(NumberCommands),
    /// Manage message templates
    #[command(subcommand)]
    Templates(TemplateCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show settings (auth token masked)
    Show,
    /// Change settings, e.g. accountSid=AC123 authToken=secret maxRetries=2
    Set {
        #[arg(value_name = "FIELD=VALUE", required = true)]
        assignments: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum NumberCommands {
    #[command(alias = "create")]
    Add {
        phone_number: String,
        friendly_name: String,
        #[arg(long = "type", default_value = "local")]
        number_type: PhoneNumberType,
        #[arg(long)]
        mms: bool,
        #[arg(long)]
        voice: bool,
        #[arg(long)]
        monthly_limit: Option<u32>,
        /// Make this the primary sending number
        #[arg(long)]
        primary: bool,
    },
    #[command(alias = "ls")]
    List,
    /// Make a number the only primary sending number
    Primary { id: String },
    /// Update fields, e.g. --set active=false
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    #[command(alias = "create")]
    Add(NewTemplate),
    #[command(alias = "ls")]
    List,
    Show { id: String },
    /// Update fields, e.g. --set active=false
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Render a template with variables from a contact, a case and --var
    Render {
        id: String,
        /// Contact ID or prefix
        #[arg(long)]
        contact: Option<String>,
        /// Case ID or prefix
        #[arg(long)]
        case: Option<String>,
        /// Extra variable (repeatable), e.g. --var deadline=Friday
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },
    /// Install the default templates if none exist
    Seed,
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Args)]
pub struct NewTemplate {
    name: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    subject: String,
    /// Body with {{variable}} placeholders
    #[arg(long)]
    body: String,
    #[arg(long, default_value = "en")]
    language: String,
}

fn masked(config: &TwilioConfig) -> TwilioConfig {
    TwilioConfig {
        auth_token: config.masked_token(),
        ..config.clone()
    }
}

fn run_config(command: ConfigCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config: TwilioConfig = store.load_setting()?;
            output.print_value(&masked(&config), |c| {
                let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "(not set)".to_string());
                println!("Configured:        {}", if config.is_configured() { "yes" } else { "no" });
                println!("Account SID:       {}", or_unset(&c.account_sid));
                println!("Auth token:        {}", or_unset(&c.auth_token));
                println!("Messaging service: {}", or_unset(&c.messaging_service_sid));
                println!("Status callback:   {}", or_unset(&c.status_callback_url));
                println!("Max retries:       {}", c.max_retries);
                println!("Retry delay:       {}s", c.retry_delay);
                println!("Delivery reports:  {}", c.enable_delivery_reports);
                println!("Error alerts:      {}", c.enable_error_notifications);
            });
        }
        ConfigCommands::Set { assignments } => {
            let (before, after) = set_setting::<TwilioConfig>(store, &assignments)?;
            let mut changes = diff_changes(&before, &after);
            for change in changes.iter_mut().filter(|c| c.field == "authToken") {
                change.old_value = before.masked_token();
                change.new_value = after.masked_token();
            }
            log_audit(
                store,
                AuditEntry::new(
                    AuditAction::Update,
                    EntityType::Setting,
                    "twilio-config",
                    "Updated SMS provider settings",
                )
                .with_changes(changes),
            )?;
            output.success("Saved SMS provider settings");
        }
    }
    Ok(())
}

fn run_numbers(command: NumberCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        NumberCommands::Add {
            phone_number,
            friendly_name,
            number_type,
            mms,
            voice,
            monthly_limit,
            primary,
        } => {
            let mut number = PhoneNumber::new(phone_number, friendly_name);
            number.number_type = number_type;
            number.capabilities.mms = mms;
            number.capabilities.voice = voice;
            number.monthly_messages_limit = monthly_limit;
            let number = super::create(store, number, output)?;
            let only_number = store.get_all::<PhoneNumber>()?.len() == 1;
            if primary || only_number {
                set_primary_number(store, number.id)?;
            }
        }
        NumberCommands::List => output.print_records(&store.get_all::<PhoneNumber>()?),
        NumberCommands::Primary { id } => {
            let number: PhoneNumber = resolve(store, &id)?;
            let number = set_primary_number(store, number.id)?;
            output.success(&format!("{} is now the primary number", number.phone_number));
        }
        NumberCommands::Update { id, set } => {
            super::update::<PhoneNumber>(store, &id, &set, output)?;
        }
        NumberCommands::Delete { id } => super::delete::<PhoneNumber>(store, &id, output)?,
    }
    Ok(())
}

fn run_templates(command: TemplateCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        TemplateCommands::Add(new) => {
            let mut template = MessageTemplate::new(new.name, new.category, new.subject, new.body);
            template.language = new.language;
            super::create(store, template, output)?;
        }
        TemplateCommands::List => output.print_records(&store.get_all::<MessageTemplate>()?),
        TemplateCommands::Show { id } => super::show::<MessageTemplate>(store, &id, output)?,
        TemplateCommands::Update { id, set } => {
            let template = super::update::<MessageTemplate>(store, &id, &set, output)?;
            let variables = extract_variables_from_template(&template.body);
            if variables != template.variables {
                store.modify(template.id, |t: &mut MessageTemplate| t.variables = variables)?;
            }
        }
        TemplateCommands::Render {
            id,
            contact,
            case,
            vars,
        } => {
            let template: MessageTemplate = resolve(store, &id)?;
            let contact: Option<Contact> = contact.map(|c| resolve(store, &c)).transpose()?;
            let case: Option<Case> = case.map(|c| resolve(store, &c)).transpose()?;

            let mut variables: HashMap<String, String> = match &contact {
                Some(contact) => template_variables(contact, case.as_ref()),
                None => HashMap::new(),
            };
            for var in &vars {
                let (name, value) = var
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected NAME=VALUE, got '{}'", var))?;
                variables.insert(name.trim().to_string(), value.to_string());
            }
            let missing: Vec<&String> = template
                .variables
                .iter()
                .filter(|v| !variables.contains_key(*v))
                .collect();
            if !missing.is_empty() {
                output.warn(&format!(
                    "Unfilled variables: {}",
                    missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ));
            }

            let (_, body) = render_template(store, template.id, &variables)?;
            let segments = calculate_message_segments(&body);
            output.print_value(&serde_json::json!({ "body": body, "segments": segments }), |_| {
                println!("{}", body);
                println!("\n({} segment{})", segments, if segments == 1 { "" } else { "s" });
            });
            if output.is_quiet() {
                println!("{}", body);
            }
        }
        TemplateCommands::Seed => {
            let count = store.seed_default_templates()?;
            output.success(&format!("Installed {} template(s)", count));
        }
        TemplateCommands::Delete { id } => super::delete::<MessageTemplate>(store, &id, output)?,
    }
    Ok(())
}

pub fn run(command: TwilioCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        TwilioCommands::Config(command) => run_config(command, store, output),
        TwilioCommands::Numbers(command) => run_numbers(command, store, output),
        TwilioCommands::Templates(command) => run_templates(command, store, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use courtline_core::models::AuditLog;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet, true)
    }

    #[test]
    fn test_config_set_validates_and_masks_audit() {
        let mut store = Store::in_memory();
        let bad = run_config(
            ConfigCommands::Set { assignments: vec!["maxRetries=9".to_string()] },
            &mut store,
            &quiet(),
        );
        assert!(bad.is_err());

        run_config(
            ConfigCommands::Set {
                assignments: vec![
                    "accountSid=AC123".to_string(),
                    "authToken=supersecret".to_string(),
                ],
            },
            &mut store,
            &quiet(),
        )
        .unwrap();

        let config: TwilioConfig = store.load_setting().unwrap();
        assert!(config.is_configured());
        assert_eq!(config.auth_token.as_deref(), Some("supersecret"));

        let logs: Vec<AuditLog> = store.get_all().unwrap();
        let json = serde_json::to_string(&logs).unwrap();
        assert!(!json.contains("supersecret"));
        assert!(json.contains("*******cret"));
    }

    #[test]
    fn test_first_number_becomes_primary() {
        let mut store = Store::in_memory();
        for (phone, name) in [("+15550000001", "Main"), ("+15550000002", "Backup")] {
            run_numbers(
                NumberCommands::Add {
                    phone_number: phone.to_string(),
                    friendly_name: name.to_string(),
                    number_type: PhoneNumberType::Local,
                    mms: false,
                    voice: false,
                    monthly_limit: None,
                    primary: false,
                },
                &mut store,
                &quiet(),
            )
            .unwrap();
        }

        let numbers: Vec<PhoneNumber> = store.get_all().unwrap();
        let primary: Vec<&PhoneNumber> = numbers.iter().filter(|n| n.is_primary).collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].friendly_name, "Main");
    }

    #[test]
    fn test_template_update_refreshes_variables() {
        let mut store = Store::in_memory();
        let template = store
            .add(MessageTemplate::new("Note", "general", "Hi", "Hello {{name}}"))
            .unwrap();

        run_templates(
            TemplateCommands::Update {
                id: template.id.to_string(),
                set: vec!["body=See you {{date}}, {{name}}".to_string()],
            },
            &mut store,
            &quiet(),
        )
        .unwrap();

        let stored: MessageTemplate = store.get_by_id(template.id).unwrap().unwrap();
        assert_eq!(stored.variables, vec!["date", "name"]);
    }

    #[test]
    fn test_render_counts_usage() {
        let mut store = Store::in_memory();
        let template = store
            .add(MessageTemplate::new("Note", "general", "Hi", "Hello {{name}}"))
            .unwrap();

        run_templates(
            TemplateCommands::Render {
                id: template.id.to_string(),
                contact: None,
                case: None,
                vars: vec!["name=Ana".to_string()],
            },
            &mut store,
            &quiet(),
        )
        .unwrap();

        let stored: MessageTemplate = store.get_by_id(template.id).unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
    }
}
