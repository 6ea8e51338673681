//! Command implementations.
//!
//! Commands that touch the catalog run against a [`Workspace`]: the opened
//! database, resolved settings, and the tokio runtime that carries the sync
//! pipeline. A one-shot command flushes its pending syncs on exit; `gt
//! console` keeps one workspace alive so the debounce delay applies.

pub mod chat;
pub mod completions;
pub mod config;
pub mod console;
pub mod document;
pub mod init;
pub mod knowledge;
pub mod sync;
pub mod trail;
pub mod version;

use crate::catalog::Catalog;
use crate::cli::Commands;
use crate::config::{default_actor, resolve_db_path, ResolvedConfig};
use crate::error::{Error, Result};
use crate::model::{RecordKey, SyncableRecord};
use crate::pipeline::Services;
use crate::storage::{shared, SharedStorage, SqliteStorage};
use crate::sync::DebounceScheduler;
use colored::Colorize;
use std::cell::OnceCell;
use std::future::Future;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// An opened database plus the services around it.
pub struct Workspace {
    runtime: Runtime,
    config: ResolvedConfig,
    catalog: Catalog,
    services: OnceCell<Services>,
    scheduler: Option<DebounceScheduler>,
}

impl Workspace {
    /// Open the database and, when sync is enabled, attach the pipeline.
    ///
    /// A pipeline that cannot be built is logged and left off: catalog
    /// edits still succeed, they just are not synced.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the database doesn't exist, or `Config`
    /// if the settings are invalid.
    pub fn open(db_path: Option<&PathBuf>, actor: Option<&str>) -> Result<Self> {
        let db_path =
            resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let config = ResolvedConfig::resolve()?;
        let store = shared(SqliteStorage::open(&db_path)?);
        let runtime = Runtime::new()?;
        let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
        let mut catalog = Catalog::new(store.clone(), &actor);

        let services = OnceCell::new();
        let mut scheduler = None;
        if config.sync_enabled {
            match Services::from_config(&config, store) {
                Ok(built) => {
                    scheduler = Some(built.attach(&mut catalog, runtime.handle().clone()));
                    let _ = services.set(built);
                }
                Err(e) => warn!(error = %e, "Knowledge-base sync unavailable; edits will not be synced"),
            }
        }

        Ok(Self {
            runtime,
            config,
            catalog,
            services,
            scheduler,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn store(&self) -> &SharedStorage {
        self.catalog.store()
    }

    /// Services for chat and forced syncs, built on first use.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the embedding provider is misconfigured.
    pub fn services(&self) -> Result<&Services> {
        if let Some(services) = self.services.get() {
            return Ok(services);
        }
        let built = Services::from_config(&self.config, self.store().clone())?;
        Ok(self.services.get_or_init(|| built))
    }

    /// Run a future on the workspace runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Records whose sync is still waiting on its timer.
    #[must_use]
    pub fn pending_keys(&self) -> Vec<RecordKey> {
        self.scheduler
            .as_ref()
            .map_or_else(Vec::new, DebounceScheduler::pending_keys)
    }

    /// Drop a pending sync for `key`, if any.
    pub fn cancel_pending(&self, key: RecordKey) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.cancel(key);
        }
    }

    /// Drop every pending sync. Returns how many were dropped.
    pub fn discard_pending(&self) -> usize {
        self.scheduler.as_ref().map_or(0, DebounceScheduler::cancel_all)
    }

    /// Run every pending sync now. Returns how many ran.
    pub fn flush(&self) -> usize {
        let Some(scheduler) = &self.scheduler else {
            return 0;
        };
        let flushed = self.runtime.block_on(scheduler.flush());
        if flushed > 0 {
            info!(flushed, "Ran pending syncs");
        }
        flushed
    }
}

/// Run a command that needs a workspace.
///
/// # Errors
///
/// Returns the command's error.
pub fn dispatch(command: &Commands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        Commands::Trail { command } => trail::execute(command, ws, json),
        Commands::Knowledge { command } => knowledge::execute(command, ws, json),
        Commands::Document { command } => document::execute(command, ws, json),
        Commands::Sync { command } => sync::execute(command, ws, json),
        Commands::Chat { command } => chat::execute(command, ws, json),
        Commands::Console { discard_pending } => console::execute(ws, *discard_pending, json),
        Commands::Version => version::execute(json),
        Commands::Config { command } => config::execute(command, json),
        Commands::Completions { shell } => completions::execute(shell),
        Commands::Init { .. } => Err(Error::InvalidArgument(
            "init needs no open database; run it outside the console".into(),
        )),
    }
}

/// Print an error the way the binary reports it.
pub fn print_error(e: &Error, json: bool) {
    if json {
        eprintln!("{}", e.to_structured_json());
    } else if let Some(hint) = e.hint() {
        eprintln!("{} {e}\n  Hint: {hint}", "Error:".red().bold());
    } else {
        eprintln!("{} {e}", "Error:".red().bold());
    }
}

/// Delete a record and report it.
fn delete_record(ws: &Workspace, key: RecordKey, json: bool) -> Result<()> {
    let record = ws.block_on(ws.catalog().delete(key))?;

    if crate::is_silent() {
        println!("{}", key.id);
        return Ok(());
    }
    if json {
        let output = serde_json::json!({
            "deleted": true,
            "kind": key.kind,
            "id": key.id,
            "external_index_id": record.external_index_id(),
        });
        println!("{output}");
    } else {
        println!("Deleted {}", describe(&record));
    }
    Ok(())
}

/// `trail 3 "Trilha do Pico"`, for human output.
fn describe(record: &SyncableRecord) -> String {
    format!(
        "{} {} \"{}\"",
        record.kind(),
        record.id(),
        record.display_name()
    )
}

/// Render an optional measurement.
fn fmt_opt<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v} {unit}"))
}

/// Index state marker for list output.
fn index_marker(record_id: Option<uuid::Uuid>) -> colored::ColoredString {
    if record_id.is_some() {
        "●".green()
    } else {
        "○".dimmed()
    }
}
