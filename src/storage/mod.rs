//! SQLite storage layer for Green Trail.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod schema;
pub mod sqlite;

pub use sqlite::{KindStatus, MutationContext, SqliteStorage, SyncStatus};

use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage shared between the catalog, the sync pipeline and the chat
/// service. Never hold the guard across an `.await`.
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Wrap a storage for sharing.
#[must_use]
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Lock shared storage.
///
/// # Errors
///
/// Returns `Other` if a previous holder panicked.
pub fn lock(store: &SharedStorage) -> Result<MutexGuard<'_, SqliteStorage>> {
    store
        .lock()
        .map_err(|_| Error::Other("storage lock poisoned".into()))
}
