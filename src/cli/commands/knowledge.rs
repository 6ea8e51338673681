//! Knowledge entry command implementations.

use super::{delete_record, index_marker, Workspace};
use crate::cli::KnowledgeCommands;
use crate::error::{Error, Result};
use crate::model::{KnowledgeEntry, RecordKey, RecordKind};
use crate::storage::lock;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct KnowledgeListOutput {
    entries: Vec<KnowledgeEntry>,
    count: usize,
}

/// Execute knowledge commands.
pub fn execute(command: &KnowledgeCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        KnowledgeCommands::Add {
            title,
            content,
            file,
        } => add(title, content.as_deref(), file.as_ref(), ws, json),
        KnowledgeCommands::Update { id, title, content } => {
            update(*id, title.as_deref(), content.as_deref(), ws, json)
        }
        KnowledgeCommands::Delete { id } => {
            delete_record(ws, RecordKey::new(RecordKind::Knowledge, *id), json)
        }
        KnowledgeCommands::List { limit } => list(*limit, ws, json),
    }
}

fn add(
    title: &str,
    content: Option<&str>,
    file: Option<&PathBuf>,
    ws: &Workspace,
    json: bool,
) -> Result<()> {
    let content = match (content, file) {
        (Some(content), _) => content.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(Error::InvalidArgument("knowledge content is required".into()));
        }
    };
    let entry = ws.catalog().create_knowledge(title, &content)?;
    print_saved("Created", &entry, json)
}

fn update(
    id: i64,
    title: Option<&str>,
    content: Option<&str>,
    ws: &Workspace,
    json: bool,
) -> Result<()> {
    if title.is_none() && content.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to update: pass --title or --content".into(),
        ));
    }
    let entry = ws.catalog().update_knowledge(id, title, content)?;
    print_saved("Updated", &entry, json)
}

fn print_saved(verb: &str, entry: &KnowledgeEntry, json: bool) -> Result<()> {
    if crate::is_silent() {
        println!("{}", entry.id);
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string(entry)?);
    } else {
        println!("{verb} knowledge entry {}: {}", entry.id, entry.title);
    }
    Ok(())
}

fn list(limit: Option<usize>, ws: &Workspace, json: bool) -> Result<()> {
    let entries = lock(ws.store())?.list_knowledge(limit)?;

    if crate::is_csv() {
        println!("id,title,content,external_index_id");
        for e in &entries {
            println!(
                "{},{},{},{}",
                e.id,
                crate::csv_escape(&e.title),
                crate::csv_escape(&e.content),
                e.external_index_id.map(|u| u.to_string()).unwrap_or_default()
            );
        }
    } else if json {
        let output = KnowledgeListOutput {
            count: entries.len(),
            entries,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if entries.is_empty() {
        println!("No knowledge entries found.");
    } else {
        println!("Knowledge entries ({} found):", entries.len());
        println!();
        for e in &entries {
            println!("{} [{}] {}", index_marker(e.external_index_id), e.id, e.title);
            let preview: String = e.content.chars().take(60).collect();
            if preview.len() < e.content.len() {
                println!("        {preview}...");
            } else {
                println!("        {preview}");
            }
        }
    }
    Ok(())
}
