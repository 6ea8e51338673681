//! Document command implementations.

use super::{delete_record, index_marker, Workspace};
use crate::cli::DocumentCommands;
use crate::error::{Error, Result};
use crate::model::{Document, RecordKey, RecordKind};
use crate::storage::lock;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct DocumentListOutput {
    documents: Vec<Document>,
    count: usize,
}

/// Execute document commands.
pub fn execute(command: &DocumentCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        DocumentCommands::Add {
            path,
            title,
            media_type,
        } => add(path, title.as_deref(), media_type.as_deref(), ws, json),
        DocumentCommands::Delete { id } => {
            delete_record(ws, RecordKey::new(RecordKind::Document, *id), json)
        }
        DocumentCommands::List { limit } => list(*limit, ws, json),
    }
}

fn add(
    path: &Path,
    title: Option<&str>,
    media_type: Option<&str>,
    ws: &Workspace,
    json: bool,
) -> Result<()> {
    if !path.is_file() {
        return Err(Error::InvalidArgument(format!(
            "document file not found: {}",
            path.display()
        )));
    }
    // The sync runs later, possibly from another directory
    let absolute = std::fs::canonicalize(path)?;
    let title = match title {
        Some(t) => t.to_string(),
        None => absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let document =
        ws.catalog()
            .create_document(&title, &absolute.to_string_lossy(), media_type)?;

    if crate::is_silent() {
        println!("{}", document.id);
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string(&document)?);
    } else {
        println!(
            "Registered document {}: {} ({})",
            document.id,
            document.title.bold(),
            document
                .effective_media_type()
                .unwrap_or_else(|| "unknown type".to_string())
        );
    }
    Ok(())
}

fn list(limit: Option<usize>, ws: &Workspace, json: bool) -> Result<()> {
    let documents = lock(ws.store())?.list_documents(limit)?;

    if crate::is_csv() {
        println!("id,title,file_path,media_type,processed,external_index_id");
        for d in &documents {
            println!(
                "{},{},{},{},{},{}",
                d.id,
                crate::csv_escape(&d.title),
                crate::csv_escape(&d.file_path),
                d.effective_media_type().unwrap_or_default(),
                d.processed,
                d.external_index_id.map(|u| u.to_string()).unwrap_or_default()
            );
        }
    } else if json {
        let output = DocumentListOutput {
            count: documents.len(),
            documents,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if documents.is_empty() {
        println!("No documents found.");
    } else {
        println!("Documents ({} found):", documents.len());
        println!();
        for d in &documents {
            let state = if d.processed {
                "processed".green()
            } else {
                "pending".yellow()
            };
            println!(
                "{} [{}] {} [{}]",
                index_marker(d.external_index_id),
                d.id,
                d.title,
                state
            );
            println!("        {}", d.file_path.dimmed());
        }
    }
    Ok(())
}
