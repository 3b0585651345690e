//! Case command handlers

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use courtline_core::models::{Case, CaseStatus, CaseType, EntityType, Priority};
use courtline_core::Store;

use super::Managed;
use crate::output::Output;

impl Managed for Case {
    const ENTITY: EntityType = EntityType::Case;

    fn describe(&self) -> String {
        format!("case {} ({})", self.docket_number, self.title)
    }
}

#[derive(Subcommand)]
pub enum CaseCommands {
    /// Open a new case
    #[command(alias = "create")]
    Add(NewCase),
    /// List cases
    #[command(alias = "ls")]
    List {
        /// Search docket number, title or judge
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long)]
        status: Option<CaseStatus>,
        #[arg(long = "type")]
        case_type: Option<CaseType>,
        /// Only cases with a hearing after today
        #[arg(long)]
        upcoming: bool,
    },
    /// Show case details
    Show {
        /// Case ID (full UUID or prefix)
        id: String,
    },
    /// Update fields, e.g. --set status=active --set nextHearingDate=2025-03-04
    Update {
        /// Case ID (full UUID or prefix)
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Delete a case
    #[command(alias = "rm")]
    Delete {
        /// Case ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Args)]
pub struct NewCase {
    /// Court docket number
    docket: String,
    title: String,
    #[arg(long = "type", default_value = "dependency")]
    case_type: CaseType,
    #[arg(long, default_value = "medium")]
    priority: Priority,
    /// Filing date (defaults to today)
    #[arg(long)]
    filed: Option<NaiveDate>,
    #[arg(long)]
    hearing_date: Option<NaiveDate>,
    #[arg(long)]
    hearing_time: Option<String>,
    #[arg(long)]
    hearing_location: Option<String>,
    #[arg(long)]
    hearing_type: Option<String>,
    #[arg(long)]
    judge: Option<String>,
    #[arg(long)]
    case_worker: Option<String>,
    /// Child involved (repeatable)
    #[arg(long = "child")]
    children: Vec<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl NewCase {
    fn into_case(self) -> Case {
        let mut case = Case::new(self.docket, self.title, self.case_type);
        case.priority = self.priority;
        if let Some(filed) = self.filed {
            case.filing_date = filed;
        }
        case.next_hearing_date = self.hearing_date;
        case.next_hearing_time = self.hearing_time;
        case.next_hearing_location = self.hearing_location;
        case.next_hearing_type = self.hearing_type;
        case.assigned_judge = self.judge;
        case.assigned_case_worker = self.case_worker;
        case.children_involved = self.children;
        case.notes = self.notes;
        case
    }
}

pub fn run(command: CaseCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        CaseCommands::Add(new) => super::create(store, new.into_case(), output).map(|_| ()),
        CaseCommands::List {
            query,
            status,
            case_type,
            upcoming,
        } => {
            let today = Utc::now().date_naive();
            let cases: Vec<Case> = store
                .get_all::<Case>()?
                .into_iter()
                .filter(|c| c.matches(&query))
                .filter(|c| status.map_or(true, |s| c.status == s))
                .filter(|c| case_type.map_or(true, |t| c.case_type == t))
                .filter(|c| !upcoming || c.has_upcoming_hearing(today))
                .collect();
            output.print_records(&cases);
            Ok(())
        }
        CaseCommands::Show { id } => super::show::<Case>(store, &id, output),
        CaseCommands::Update { id, set } => super::update::<Case>(store, &id, &set, output).map(|_| ()),
        CaseCommands::Delete { id } => super::delete::<Case>(store, &id, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use courtline_core::models::{AuditAction, AuditLog};

    #[test]
    fn test_add_case() {
        let mut store = Store::in_memory();
        let output = Output::new(OutputFormat::Quiet, true);
        let new = NewCase {
            docket: "JV-2024-001".to_string(),
            title: "In re Smith Children".to_string(),
            case_type: CaseType::Neglect,
            priority: Priority::High,
            filed: NaiveDate::from_ymd_opt(2024, 1, 15),
            hearing_date: NaiveDate::from_ymd_opt(2030, 3, 4),
            hearing_time: Some("9:30 AM".to_string()),
            hearing_location: None,
            hearing_type: None,
            judge: Some("Hon. Rivera".to_string()),
            case_worker: None,
            children: vec!["Ana".to_string()],
            notes: None,
        };

        run(CaseCommands::Add(new), &mut store, &output).unwrap();

        let cases: Vec<Case> = store.get_all().unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].priority, Priority::High);
        assert_eq!(cases[0].children_involved, vec!["Ana"]);

        let logs: Vec<AuditLog> = store.get_all().unwrap();
        assert_eq!(logs[0].action, AuditAction::Create);
        assert_eq!(logs[0].entity_type, EntityType::Case);
    }

    #[test]
    fn test_add_rejects_blank_title() {
        let mut store = Store::in_memory();
        let output = Output::new(OutputFormat::Quiet, true);
        let case = Case::new("JV-1", " ", CaseType::Other);
        assert!(super::super::create(&mut store, case, &output).is_err());
        assert!(store.get_all::<Case>().unwrap().is_empty());
    }
}
