//! Catalog writes with change notifications.
//!
//! [`Catalog`] wraps the shared store for content writes (trails, knowledge
//! entries, documents) and tells every subscribed [`RecordObserver`] about
//! them. The sync pipeline's own bookkeeping writes go straight to the store
//! and are never published.

use crate::error::Result;
use crate::model::{
    ChangedFields, Document, KnowledgeEntry, RecordKey, SyncableRecord, Trail, TrailDraft,
};
use crate::storage::{lock, SharedStorage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// A committed create or update.
#[derive(Debug, Clone)]
pub struct RecordChange {
    /// The record as stored after the write.
    pub record: SyncableRecord,
    /// Fields the write touched, when known. `None` for creates.
    pub changed_fields: Option<ChangedFields>,
    pub created: bool,
}

/// Subscriber to catalog writes.
#[async_trait]
pub trait RecordObserver: Send + Sync {
    /// Called after a create or update commits. Must not block.
    fn on_saved(&self, change: &RecordChange);

    /// Called when a delete starts, before the record is read.
    async fn before_delete(&self, _key: RecordKey) {}

    /// Called before a record's row is removed.
    async fn on_deleted(&self, record: &SyncableRecord);
}

pub struct Catalog {
    store: SharedStorage,
    observers: Vec<Arc<dyn RecordObserver>>,
    actor: String,
}

impl Catalog {
    #[must_use]
    pub fn new(store: SharedStorage, actor: &str) -> Self {
        Self {
            store,
            observers: Vec::new(),
            actor: actor.to_string(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn RecordObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn store(&self) -> &SharedStorage {
        &self.store
    }

    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    fn publish_saved(&self, record: SyncableRecord, changed_fields: Option<ChangedFields>) {
        let change = RecordChange {
            record,
            created: changed_fields.is_none(),
            changed_fields,
        };
        debug!(
            record = %change.record.key(),
            created = change.created,
            observers = self.observers.len(),
            "Publishing save"
        );
        for observer in &self.observers {
            observer.on_saved(&change);
        }
    }

    // ======
    // Trails
    // ======

    /// Create a trail.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft is invalid or the insert fails.
    pub fn create_trail(&self, draft: &TrailDraft) -> Result<Trail> {
        let trail = lock(&self.store)?.create_trail(draft, &self.actor)?;
        self.publish_saved(trail.clone().into(), None);
        Ok(trail)
    }

    /// Replace a trail's fields.
    ///
    /// # Errors
    ///
    /// Returns `TrailNotFound` if the trail doesn't exist.
    pub fn update_trail(&self, id: i64, draft: &TrailDraft) -> Result<Trail> {
        let (trail, changed) = lock(&self.store)?.update_trail(id, draft, &self.actor)?;
        self.publish_saved(trail.clone().into(), Some(changed));
        Ok(trail)
    }

    // =========
    // Knowledge
    // =========

    /// Create a knowledge entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the title or content is invalid.
    pub fn create_knowledge(&self, title: &str, content: &str) -> Result<KnowledgeEntry> {
        let entry = lock(&self.store)?.create_knowledge(title, content, &self.actor)?;
        self.publish_saved(entry.clone().into(), None);
        Ok(entry)
    }

    /// Update a knowledge entry.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeNotFound` if the entry doesn't exist.
    pub fn update_knowledge(
        &self,
        id: i64,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<KnowledgeEntry> {
        let (entry, changed) =
            lock(&self.store)?.update_knowledge(id, title, content, &self.actor)?;
        self.publish_saved(entry.clone().into(), Some(changed));
        Ok(entry)
    }

    // =========
    // Documents
    // =========

    /// Register a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the title or path is invalid.
    pub fn create_document(
        &self,
        title: &str,
        file_path: &str,
        media_type: Option<&str>,
    ) -> Result<Document> {
        let document =
            lock(&self.store)?.create_document(title, file_path, media_type, &self.actor)?;
        self.publish_saved(document.clone().into(), None);
        Ok(document)
    }

    /// Update a document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if the document doesn't exist.
    pub fn update_document(
        &self,
        id: i64,
        title: Option<&str>,
        file_path: Option<&str>,
        media_type: Option<&str>,
    ) -> Result<Document> {
        let (document, changed) = lock(&self.store)?.update_document(
            id,
            title,
            file_path,
            media_type,
            &self.actor,
        )?;
        self.publish_saved(document.clone().into(), Some(changed));
        Ok(document)
    }

    // =======
    // Deletes
    // =======

    /// Delete a record of any kind.
    ///
    /// Observers see the record while its row still exists, so index
    /// cleanup happens before the row is gone.
    ///
    /// # Errors
    ///
    /// Returns the kind's not-found error if the record doesn't exist.
    pub async fn delete(&self, key: RecordKey) -> Result<SyncableRecord> {
        for observer in &self.observers {
            observer.before_delete(key).await;
        }
        // Read after the hooks: a sync that finished meanwhile may have
        // assigned the record its index id
        let record = self.read(key)?;
        for observer in &self.observers {
            observer.on_deleted(&record).await;
        }
        lock(&self.store)?.delete_record(key, &self.actor)
    }

    fn read(&self, key: RecordKey) -> Result<SyncableRecord> {
        lock(&self.store)?
            .get_record(key)?
            .ok_or_else(|| key.kind.not_found(key.id))
    }
}
