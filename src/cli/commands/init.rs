//! Create the Green Trail database.
//!
//! The database lives at `~/.greentrail/data/greentrail.db` unless `--db`,
//! `GT_DB`, or `GREENTRAIL_DB` points elsewhere. The schema is applied when
//! the file is first opened.

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput<'a> {
    database: &'a Path,
    recreated: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    let existed = db_path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }
    if existed {
        remove_database(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    SqliteStorage::open(&db_path)?;

    if crate::is_silent() {
        println!("{}", db_path.display());
        return Ok(());
    }
    if json {
        let output = InitOutput {
            database: &db_path,
            recreated: existed,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        let verb = if existed { "Recreated" } else { "Created" };
        println!("{verb} Green Trail database at {}", db_path.display());
    }
    Ok(())
}

/// Remove the database file and its WAL sidecars.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = db_path.as_os_str().to_owned();
        sidecar.push(suffix);
        let sidecar = PathBuf::from(sidecar);
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
    }
    Ok(())
}
