//! Contact command handlers

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};

use courtline_core::models::{Case, Contact, EntityType, PreferredContact, Relationship};
use courtline_core::validation::is_valid_zip_code;
use courtline_core::Store;

use super::{edit, resolve, Managed};
use crate::output::Output;

impl Managed for Contact {
    const ENTITY: EntityType = EntityType::Contact;

    fn describe(&self) -> String {
        format!("contact {} ({})", self.full_name(), self.phone_number)
    }
}

#[derive(Subcommand)]
pub enum ContactCommands {
    /// Add a contact
    #[command(alias = "create")]
    Add(NewContact),
    /// List contacts
    #[command(alias = "ls")]
    List {
        /// Search name, phone or email
        #[arg(short, long, default_value = "")]
        query: String,
        /// Only contacts who prefer SMS and have consented
        #[arg(long)]
        sms_eligible: bool,
        /// Only contacts linked to this case
        #[arg(long)]
        case: Option<String>,
    },
    /// Show contact details
    Show { id: String },
    /// Update fields, e.g. --set email=jane@example.com
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Record or revoke SMS consent
    Consent {
        id: String,
        #[arg(long)]
        revoke: bool,
    },
    /// Link a contact to a case
    Link { id: String, case: String },
    /// Unlink a contact from a case
    Unlink { id: String, case: String },
    /// Delete a contact
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Args)]
pub struct NewContact {
    first_name: String,
    last_name: String,
    #[arg(long, default_value = "other")]
    relationship: Relationship,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    alternate_phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long, default_value = "sms")]
    preferred: PreferredContact,
    /// Record SMS consent as of today
    #[arg(long)]
    consent: bool,
    #[arg(long, default_value = "en")]
    language: String,
    #[arg(long)]
    interpreter: bool,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long)]
    emergency: bool,
    /// Case to link (ID or prefix, repeatable)
    #[arg(long = "case")]
    cases: Vec<String>,
    #[arg(long)]
    notes: Option<String>,
}

fn add(store: &mut Store, new: NewContact, output: &Output) -> Result<()> {
    let mut contact = Contact::new(new.first_name, new.last_name, new.relationship, new.phone);
    contact.alternate_phone = new.alternate_phone;
    contact.email = new.email;
    contact.preferred_contact = new.preferred;
    if new.consent {
        contact.grant_sms_consent(Utc::now().date_naive());
    }
    contact.language = new.language;
    contact.needs_interpreter = new.interpreter;
    contact.address = new.address;
    contact.city = new.city;
    contact.state = new.state;
    if let Some(zip) = new.zip.as_deref().filter(|z| !is_valid_zip_code(z)) {
        output.warn(&format!("ZIP code '{}' is not in 12345 or 12345-6789 form", zip));
    }
    contact.zip_code = new.zip;
    contact.emergency_contact = new.emergency;
    contact.notes = new.notes;
    for case in &new.cases {
        let case: Case = resolve(store, case)?;
        contact.link_case(case.id.to_string());
    }

    super::create(store, contact, output)?;
    Ok(())
}

pub fn run(command: ContactCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        ContactCommands::Add(new) => add(store, new, output),
        ContactCommands::List {
            query,
            sms_eligible,
            case,
        } => {
            let case_id = case
                .map(|c| resolve::<Case>(store, &c).map(|c| c.id.to_string()))
                .transpose()?;
            let contacts: Vec<Contact> = store
                .get_all::<Contact>()?
                .into_iter()
                .filter(|c| c.matches(&query))
                .filter(|c| !sms_eligible || c.is_sms_eligible())
                .filter(|c| case_id.as_ref().map_or(true, |id| c.linked_cases.contains(id)))
                .collect();
            output.print_records(&contacts);
            Ok(())
        }
        ContactCommands::Show { id } => super::show::<Contact>(store, &id, output),
        ContactCommands::Update { id, set } => {
            super::update::<Contact>(store, &id, &set, output).map(|_| ())
        }
        ContactCommands::Consent { id, revoke } => {
            let today = Utc::now().date_naive();
            edit(store, &id, output, |c: &mut Contact| {
                if revoke {
                    c.sms_consent = false;
                    c.consent_date = None;
                } else {
                    c.grant_sms_consent(today);
                }
            })
            .map(|_| ())
        }
        ContactCommands::Link { id, case } => {
            let case: Case = resolve(store, &case)?;
            edit(store, &id, output, |c: &mut Contact| {
                c.link_case(case.id.to_string());
            })
            .map(|_| ())
        }
        ContactCommands::Unlink { id, case } => {
            let case_id = match resolve::<Case>(store, &case) {
                Ok(c) => c.id.to_string(),
                // The case may already be gone; unlink the raw id
                Err(_) => case,
            };
            edit(store, &id, output, |c: &mut Contact| {
                c.unlink_case(&case_id);
            })
            .map(|_| ())
        }
        ContactCommands::Delete { id } => super::delete::<Contact>(store, &id, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use courtline_core::models::CaseType;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet, true)
    }

    #[test]
    fn test_consent_and_links() {
        let mut store = Store::in_memory();
        let case = store
            .add(Case::new("JV-2024-001", "In re Lopez", CaseType::Dependency))
            .unwrap();
        let contact = store
            .add(Contact::new("Maria", "Lopez", Relationship::Mother, "+15551234567"))
            .unwrap();
        let id = contact.id.to_string();

        run(ContactCommands::Consent { id: id.clone(), revoke: false }, &mut store, &quiet())
            .unwrap();
        let stored: Contact = store.get_by_id(contact.id).unwrap().unwrap();
        assert!(stored.is_sms_eligible());
        assert!(stored.consent_date.is_some());

        run(
            ContactCommands::Link { id: id.clone(), case: case.id.to_string()[..8].to_string() },
            &mut store,
            &quiet(),
        )
        .unwrap();
        let stored: Contact = store.get_by_id(contact.id).unwrap().unwrap();
        assert_eq!(stored.linked_cases, vec![case.id.to_string()]);

        run(
            ContactCommands::Unlink { id: id.clone(), case: case.id.to_string() },
            &mut store,
            &quiet(),
        )
        .unwrap();
        run(ContactCommands::Consent { id, revoke: true }, &mut store, &quiet()).unwrap();
        let stored: Contact = store.get_by_id(contact.id).unwrap().unwrap();
        assert!(stored.linked_cases.is_empty());
        assert!(!stored.sms_consent);
        assert!(stored.consent_date.is_none());
    }

    #[test]
    fn test_invalid_phone_rejected() {
        let mut store = Store::in_memory();
        let contact = Contact::new("Maria", "Lopez", Relationship::Mother, "555");
        assert!(super::super::create(&mut store, contact, &quiet()).is_err());
    }
}
