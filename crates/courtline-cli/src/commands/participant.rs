//! Participant command handlers

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use courtline_core::models::{Case, EntityType, Participant, ParticipantRole};
use courtline_core::Store;

use super::{resolve, Managed};
use crate::output::Output;

impl Managed for Participant {
    const ENTITY: EntityType = EntityType::Participant;

    fn describe(&self) -> String {
        format!("{} {}", self.role.label().to_lowercase(), self.full_name())
    }
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Add a participant to a case
    #[command(alias = "create")]
    Add(NewParticipant),
    /// List participants
    #[command(alias = "ls")]
    List {
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long)]
        role: Option<ParticipantRole>,
        /// Only participants in this case (ID or prefix)
        #[arg(long)]
        case: Option<String>,
    },
    Show { id: String },
    /// Update fields, e.g. --set courtAppointed=true
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Args)]
pub struct NewParticipant {
    first_name: String,
    last_name: String,
    #[arg(long)]
    role: ParticipantRole,
    /// Case ID or prefix
    #[arg(long)]
    case: String,
    #[arg(long)]
    dob: Option<NaiveDate>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    bar_number: Option<String>,
    #[arg(long)]
    court_appointed: bool,
    #[arg(long)]
    special_needs: Option<String>,
    #[arg(long, default_value = "en")]
    language: String,
    #[arg(long)]
    notes: Option<String>,
}

pub fn run(command: ParticipantCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        ParticipantCommands::Add(new) => {
            let case: Case = resolve(store, &new.case)?;
            let mut participant =
                Participant::new(new.first_name, new.last_name, new.role, case.id.to_string());
            participant.date_of_birth = new.dob;
            participant.contact_phone = new.phone;
            participant.contact_email = new.email;
            participant.attorney_bar_number = new.bar_number;
            participant.court_appointed = new.court_appointed;
            participant.special_needs = new.special_needs;
            participant.language_preference = new.language;
            participant.notes = new.notes;
            super::create(store, participant, output).map(|_| ())
        }
        ParticipantCommands::List { query, role, case } => {
            let case_id = case
                .map(|c| resolve::<Case>(store, &c).map(|c| c.id.to_string()))
                .transpose()?;
            let participants: Vec<Participant> = store
                .get_all::<Participant>()?
                .into_iter()
                .filter(|p| p.matches(&query, role))
                .filter(|p| case_id.as_ref().map_or(true, |id| &p.case_id == id))
                .collect();
            output.print_records(&participants);
            Ok(())
        }
        ParticipantCommands::Show { id } => super::show::<Participant>(store, &id, output),
        ParticipantCommands::Update { id, set } => {
            super::update::<Participant>(store, &id, &set, output).map(|_| ())
        }
        ParticipantCommands::Delete { id } => super::delete::<Participant>(store, &id, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use courtline_core::models::CaseType;

    #[test]
    fn test_list_by_case_and_role() {
        let mut store = Store::in_memory();
        let output = Output::new(OutputFormat::Quiet, true);
        let case = store
            .add(Case::new("JV-2024-001", "In re Lee", CaseType::Dependency))
            .unwrap();

        for (first, role) in [("Sam", ParticipantRole::Child), ("Ann", ParticipantRole::Parent)] {
            let new = NewParticipant {
                first_name: first.to_string(),
                last_name: "Lee".to_string(),
                role,
                case: case.id.to_string(),
                dob: None,
                phone: None,
                email: None,
                bar_number: None,
                court_appointed: false,
                special_needs: None,
                language: "en".to_string(),
                notes: None,
            };
            run(ParticipantCommands::Add(new), &mut store, &output).unwrap();
        }

        let stored: Vec<Participant> = store.get_all().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|p| p.case_id == case.id.to_string()));
        assert_eq!(
            stored.iter().filter(|p| p.matches("", Some(ParticipantRole::Child))).count(),
            1
        );
    }
}
