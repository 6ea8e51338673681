//! Sync command implementations.
//!
//! `gt sync force` runs the pipeline immediately for the chosen records;
//! `gt sync status` reports index coverage from the catalog's bookkeeping,
//! the records still waiting on a timer, and with `--check` whether the
//! embedding provider answers.

use super::Workspace;
use crate::cli::SyncCommands;
use crate::error::Result;
use crate::model::{RecordKey, RecordKind, SyncableRecord};
use crate::storage::{lock, KindStatus};
use colored::Colorize;

/// Execute sync commands.
pub fn execute(command: &SyncCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        SyncCommands::Force { kind, ids, all } => force(kind.as_deref(), ids, *all, ws, json),
        SyncCommands::Status { events, check } => status(*events, *check, ws, json),
    }
}

/// Collect the records a `sync force` invocation names.
fn select_records(
    kind: Option<&str>,
    ids: &[i64],
    all: bool,
    ws: &Workspace,
) -> Result<Vec<SyncableRecord>> {
    let store = lock(ws.store())?;
    let kinds: Vec<RecordKind> = match kind {
        Some(raw) if !all => vec![raw.parse()?],
        _ => RecordKind::ALL.to_vec(),
    };

    if ids.is_empty() {
        let mut records = Vec::new();
        for kind in kinds {
            records.extend(store.list_records(kind)?);
        }
        return Ok(records);
    }

    // ids given means exactly one kind
    let kind = kinds[0];
    ids.iter()
        .map(|&id| {
            store
                .get_record(RecordKey::new(kind, id))?
                .ok_or_else(|| kind.not_found(id))
        })
        .collect()
}

fn force(kind: Option<&str>, ids: &[i64], all: bool, ws: &Workspace, json: bool) -> Result<()> {
    let records = select_records(kind, ids, all, ws)?;
    for record in &records {
        ws.cancel_pending(record.key());
    }

    let orchestrator = ws.services()?.orchestrator();
    let report = ws.block_on(orchestrator.force_sync(records));

    if json {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    if report.total() == 0 {
        println!("Nothing to sync.");
        return Ok(());
    }
    println!(
        "Synced {} of {} record(s), {} without content",
        report.synced,
        report.total(),
        report.skipped
    );
    for failure in &report.errors {
        println!("  {} {}: {}", "✗".red(), failure.record, failure.error);
    }
    Ok(())
}

fn status(events: u32, check: bool, ws: &Workspace, json: bool) -> Result<()> {
    let (status, recent) = {
        let store = lock(ws.store())?;
        (store.sync_status()?, store.recent_events(None, events)?)
    };
    let pending: Vec<String> = ws.pending_keys().iter().map(ToString::to_string).collect();
    let config = ws.config();
    let embedder = if check {
        let services = ws.services()?;
        Some((services.embedder_info(), ws.block_on(services.embedder_available())))
    } else {
        None
    };

    if json {
        let recent: Vec<_> = recent
            .iter()
            .map(|e| {
                serde_json::json!({
                    "entity_type": e.entity_type,
                    "entity_id": e.entity_id,
                    "event_type": e.event_type.as_str(),
                    "actor": e.actor,
                    "created_at": e.created_at,
                })
            })
            .collect();
        let output = serde_json::json!({
            "enabled": config.sync_enabled,
            "collection": config.collection,
            "delay_secs": config.sync_delay_secs,
            "pending": pending.len(),
            "pending_keys": pending,
            "embedder": embedder.as_ref().map(|(info, available)| serde_json::json!({
                "provider": info.name,
                "model": info.model,
                "available": available,
            })),
            "status": status,
            "recent_events": recent,
        });
        println!("{output}");
        return Ok(());
    }

    let state = if config.sync_enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("Knowledge-base sync: {state}");
    println!("  Collection:  {}", config.collection);
    println!("  Delay:       {}s", config.sync_delay_secs);
    println!("  Pending:     {}", pending.len());
    for key in &pending {
        println!("    {}", key.dimmed());
    }
    if let Some((info, available)) = &embedder {
        let reachable = if *available {
            "reachable".green()
        } else {
            "unreachable".red()
        };
        println!("  Embedder:    {} ({}) {reachable}", info.name, info.model);
    }
    println!();
    print_kind("Trails", &status.trails);
    print_kind("Knowledge", &status.knowledge);
    print_kind("Documents", &status.documents);
    println!(
        "  {:<11} {}/{} processed",
        "",
        status.processed_documents,
        status.documents.total
    );

    if !recent.is_empty() {
        println!();
        println!("Recent events:");
        for e in &recent {
            let when = chrono::DateTime::from_timestamp_millis(e.created_at)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            println!(
                "  {} {} {}:{} {}",
                when.dimmed(),
                e.event_type.as_str(),
                e.entity_type,
                e.entity_id,
                format!("by {}", e.actor).dimmed()
            );
        }
    }
    Ok(())
}

fn print_kind(name: &str, status: &KindStatus) {
    let unindexed = status.unindexed();
    let note = if unindexed > 0 {
        format!("({unindexed} not synced)").yellow().to_string()
    } else {
        String::new()
    };
    println!(
        "  {name:<11} {}/{} indexed {note}",
        status.indexed, status.total
    );
}
