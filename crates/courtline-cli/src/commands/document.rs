//! Document command handlers
//!
//! Documents are metadata only; no file content is stored.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use courtline_core::audit::log_document_action;
use courtline_core::models::{AuditAction, Case, Document, DocumentStatus, DocumentType, EntityType};
use courtline_core::Store;

use super::{edit, resolve, Managed};
use crate::output::Output;

impl Managed for Document {
    const ENTITY: EntityType = EntityType::Document;

    fn describe(&self) -> String {
        format!("document '{}' ({})", self.title, self.docket_number)
    }
}

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Register a document
    #[command(alias = "create")]
    Add(NewDocument),
    /// List documents
    #[command(alias = "ls")]
    List {
        /// Search title, docket, file name or tags
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long = "type")]
        doc_type: Option<DocumentType>,
        #[arg(long)]
        status: Option<DocumentStatus>,
    },
    Show { id: String },
    /// Update fields, e.g. --set confidential=true
    Update {
        id: String,
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Add a tag
    Tag { id: String, tag: String },
    /// Remove a tag
    Untag { id: String, tag: String },
    /// Move a document to the archive
    Archive { id: String },
    /// Mark every active document past its expiration date as expired
    Expire,
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Args)]
pub struct NewDocument {
    /// Case ID or prefix
    #[arg(long)]
    case: String,
    title: String,
    #[arg(long = "type", default_value = "other")]
    doc_type: DocumentType,
    #[arg(long)]
    file: String,
    /// File size in bytes
    #[arg(long)]
    size: u64,
    /// Defaults to the configured user name
    #[arg(long)]
    uploaded_by: Option<String>,
    #[arg(long)]
    confidential: bool,
    #[arg(long)]
    hipaa: bool,
    #[arg(long)]
    ferpa: bool,
    #[arg(long)]
    expires: Option<NaiveDate>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
}

fn add(store: &mut Store, new: NewDocument, output: &Output) -> Result<()> {
    let case: Case = resolve(store, &new.case)?;
    let uploaded_by = new
        .uploaded_by
        .unwrap_or_else(|| store.config().user_name.clone());

    let mut document = Document::new(
        case.id.to_string(),
        case.docket_number,
        new.title,
        new.doc_type,
        new.file,
        new.size,
        uploaded_by,
    );
    document.confidential = new.confidential;
    document.hipaa_protected = new.hipaa;
    document.ferpa_protected = new.ferpa;
    document.expiration_date = new.expires;
    document.description = new.description;
    for tag in new.tags {
        document.add_tag(tag);
    }
    super::create(store, document, output)?;
    Ok(())
}

/// Mark expired documents; returns how many changed
fn expire(store: &mut Store, today: NaiveDate) -> Result<usize> {
    let due: Vec<Document> = store
        .get_all::<Document>()?
        .into_iter()
        .filter(|d| d.status == DocumentStatus::Active && d.is_expired_on(today))
        .collect();

    for document in &due {
        store.modify(document.id, |d: &mut Document| d.status = DocumentStatus::Expired)?;
        log_document_action(
            store,
            AuditAction::Update,
            document.id,
            format!("Expired {}", document.describe()),
            vec![],
        )?;
    }
    Ok(due.len())
}

pub fn run(command: DocumentCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        DocumentCommands::Add(new) => add(store, new, output),
        DocumentCommands::List {
            query,
            doc_type,
            status,
        } => {
            let documents: Vec<Document> = store
                .get_all::<Document>()?
                .into_iter()
                .filter(|d| d.matches(&query, doc_type, status))
                .collect();
            output.print_records(&documents);
            Ok(())
        }
        DocumentCommands::Show { id } => super::show::<Document>(store, &id, output),
        DocumentCommands::Update { id, set } => {
            super::update::<Document>(store, &id, &set, output).map(|_| ())
        }
        DocumentCommands::Tag { id, tag } => edit(store, &id, output, |d: &mut Document| {
            d.add_tag(tag);
        })
        .map(|_| ()),
        DocumentCommands::Untag { id, tag } => edit(store, &id, output, |d: &mut Document| {
            d.remove_tag(&tag);
        })
        .map(|_| ()),
        DocumentCommands::Archive { id } => edit(store, &id, output, |d: &mut Document| {
            d.status = DocumentStatus::Archived;
        })
        .map(|_| ()),
        DocumentCommands::Expire => {
            let count = expire(store, Utc::now().date_naive())?;
            output.success(&format!("Marked {} document(s) expired", count));
            Ok(())
        }
        DocumentCommands::Delete { id } => super::delete::<Document>(store, &id, output),
    }
}
