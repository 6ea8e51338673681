//! SQLite storage implementation.
//!
//! This module provides the storage backend for Green Trail using SQLite.
//! Catalog writes go through [`SqliteStorage::mutate`] so each one runs in an
//! IMMEDIATE transaction and leaves an audit event behind.
//!
//! Two writes are bookkeeping-only and belong to the sync pipeline:
//! [`SqliteStorage::assign_external_index_id`] and
//! [`SqliteStorage::mark_document_processed`]. Callers must not publish
//! change notifications for them.

use crate::error::{Error, Result};
use crate::model::{
    describe_fields, validate_title, ChangedFields, ChatMessage, ChatRoom, Difficulty, Document,
    Field, KnowledgeEntry, RecordKey, RecordKind, RouteType, SyncableRecord, Trail, TrailDraft,
};
use crate::storage::events::{insert_event, recent_events, Event, EventType};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

const TRAIL_COLUMNS: &str = "id, label, description, gpx_path, difficulty, route_type, distance, duration, elevation, external_index_id, created_at, updated_at";
const KNOWLEDGE_COLUMNS: &str = "id, title, content, external_index_id, created_at, updated_at";
const DOCUMENT_COLUMNS: &str =
    "id, title, file_path, media_type, external_index_id, processed, uploaded_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation.
///
/// Passed to mutation closures to collect audit events, which are written
/// in the same transaction as the mutation itself.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation (`admin`, `sync`, ...).
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }
}

/// Index coverage for one record kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KindStatus {
    /// Number of records of this kind.
    pub total: usize,
    /// Records that have been assigned an external-index id.
    pub indexed: usize,
}

impl KindStatus {
    /// Records never synced.
    #[must_use]
    pub fn unindexed(&self) -> usize {
        self.total.saturating_sub(self.indexed)
    }
}

/// Sync coverage across the catalog.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub trails: KindStatus,
    pub knowledge: KindStatus,
    pub documents: KindStatus,
    /// Documents whose text has been embedded and upserted.
    pub processed_documents: usize,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5000)))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);
        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        Ok(result)
    }

    // ================
    // Trail Operations
    // ================

    /// Create a new trail.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft is invalid or the insert fails.
    pub fn create_trail(&mut self, draft: &TrailDraft, actor: &str) -> Result<Trail> {
        draft.validate()?;
        let id = self.mutate("create_trail", actor, |tx, ctx| {
            let now = chrono::Utc::now().timestamp_millis();
            tx.execute(
                "INSERT INTO trails (label, description, gpx_path, difficulty, route_type, distance, duration, elevation, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    draft.label,
                    draft.description,
                    draft.gpx_path,
                    draft.difficulty.as_str(),
                    draft.route_type.as_str(),
                    draft.distance,
                    draft.duration,
                    draft.elevation,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            ctx.events.push(
                Event::new("trail", &id.to_string(), EventType::TrailCreated, actor)
                    .with_comment(&draft.label),
            );
            Ok(id)
        })?;
        self.get_trail(id)?.ok_or(Error::TrailNotFound { id })
    }

    /// Get a trail by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_trail(&self, id: i64) -> Result<Option<Trail>> {
        Ok(query_trail(&self.conn, id)?)
    }

    /// List trails, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_trails(&self, limit: Option<usize>) -> Result<Vec<Trail>> {
        let sql =
            format!("SELECT {TRAIL_COLUMNS} FROM trails ORDER BY updated_at DESC, id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([sql_limit(limit)], map_trail_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Replace a trail's writable fields.
    ///
    /// Returns the stored trail and the set of fields whose value changed.
    ///
    /// # Errors
    ///
    /// Returns `TrailNotFound` if the trail doesn't exist, or an error if
    /// the draft is invalid.
    pub fn update_trail(
        &mut self,
        id: i64,
        draft: &TrailDraft,
        actor: &str,
    ) -> Result<(Trail, ChangedFields)> {
        draft.validate()?;
        let changed = self.mutate("update_trail", actor, |tx, ctx| {
            let old = query_trail(tx, id)?.ok_or(Error::TrailNotFound { id })?;
            let changed = trail_changes(&old, draft);
            let now = chrono::Utc::now().timestamp_millis();
            tx.execute(
                "UPDATE trails
                 SET label = ?1, description = ?2, gpx_path = ?3, difficulty = ?4, route_type = ?5,
                     distance = ?6, duration = ?7, elevation = ?8, updated_at = ?9
                 WHERE id = ?10",
                rusqlite::params![
                    draft.label,
                    draft.description,
                    draft.gpx_path,
                    draft.difficulty.as_str(),
                    draft.route_type.as_str(),
                    draft.distance,
                    draft.duration,
                    draft.elevation,
                    now,
                    id,
                ],
            )?;
            ctx.record_change(
                "trail",
                &id.to_string(),
                EventType::TrailUpdated,
                None,
                Some(describe_fields(&changed)),
            );
            Ok(changed)
        })?;
        let trail = self.get_trail(id)?.ok_or(Error::TrailNotFound { id })?;
        Ok((trail, changed))
    }

    // ====================
    // Knowledge Operations
    // ====================

    /// Create a knowledge entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the title or content is invalid or the insert fails.
    pub fn create_knowledge(
        &mut self,
        title: &str,
        content: &str,
        actor: &str,
    ) -> Result<KnowledgeEntry> {
        validate_title(title, "knowledge")?;
        if content.trim().is_empty() {
            return Err(Error::InvalidArgument("knowledge content is required".into()));
        }
        let id = self.mutate("create_knowledge", actor, |tx, ctx| {
            let now = chrono::Utc::now().timestamp_millis();
            tx.execute(
                "INSERT INTO knowledge_entries (title, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![title, content, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.events.push(
                Event::new("knowledge", &id.to_string(), EventType::KnowledgeCreated, actor)
                    .with_comment(title),
            );
            Ok(id)
        })?;
        self.get_knowledge(id)?
            .ok_or(Error::KnowledgeNotFound { id })
    }

    /// Get a knowledge entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_knowledge(&self, id: i64) -> Result<Option<KnowledgeEntry>> {
        Ok(query_knowledge(&self.conn, id)?)
    }

    /// List knowledge entries, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_knowledge(&self, limit: Option<usize>) -> Result<Vec<KnowledgeEntry>> {
        let sql = format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_entries ORDER BY updated_at DESC, id DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([sql_limit(limit)], map_knowledge_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Update a knowledge entry's title and/or content.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeNotFound` if the entry doesn't exist.
    pub fn update_knowledge(
        &mut self,
        id: i64,
        title: Option<&str>,
        content: Option<&str>,
        actor: &str,
    ) -> Result<(KnowledgeEntry, ChangedFields)> {
        if let Some(t) = title {
            validate_title(t, "knowledge")?;
        }
        if content.is_some_and(|c| c.trim().is_empty()) {
            return Err(Error::InvalidArgument("knowledge content is required".into()));
        }
        let changed = self.mutate("update_knowledge", actor, |tx, ctx| {
            let old = query_knowledge(tx, id)?.ok_or(Error::KnowledgeNotFound { id })?;
            let mut changed = ChangedFields::new();
            let title = title.unwrap_or(&old.title);
            let content = content.unwrap_or(&old.content);
            if title != old.title {
                changed.insert(Field::Title);
            }
            if content != old.content {
                changed.insert(Field::Content);
            }
            tx.execute(
                "UPDATE knowledge_entries SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![title, content, chrono::Utc::now().timestamp_millis(), id],
            )?;
            ctx.record_change(
                "knowledge",
                &id.to_string(),
                EventType::KnowledgeUpdated,
                None,
                Some(describe_fields(&changed)),
            );
            Ok(changed)
        })?;
        let entry = self
            .get_knowledge(id)?
            .ok_or(Error::KnowledgeNotFound { id })?;
        Ok((entry, changed))
    }

    // ===================
    // Document Operations
    // ===================

    /// Register an uploaded document.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is invalid or the insert fails.
    pub fn create_document(
        &mut self,
        title: &str,
        file_path: &str,
        media_type: Option<&str>,
        actor: &str,
    ) -> Result<Document> {
        validate_title(title, "document")?;
        if file_path.trim().is_empty() {
            return Err(Error::InvalidArgument("document file is required".into()));
        }
        let id = self.mutate("create_document", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO documents (title, file_path, media_type, processed, uploaded_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                rusqlite::params![
                    title,
                    file_path,
                    media_type,
                    chrono::Utc::now().timestamp_millis()
                ],
            )?;
            let id = tx.last_insert_rowid();
            ctx.events.push(
                Event::new("document", &id.to_string(), EventType::DocumentCreated, actor)
                    .with_comment(title),
            );
            Ok(id)
        })?;
        self.get_document(id)?.ok_or(Error::DocumentNotFound { id })
    }

    /// Get a document by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_document(&self, id: i64) -> Result<Option<Document>> {
        Ok(query_document(&self.conn, id)?)
    }

    /// List documents, newest upload first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_documents(&self, limit: Option<usize>) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY uploaded_at DESC, id DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([sql_limit(limit)], map_document_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Update a document's title, file or declared media type.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if the document doesn't exist.
    pub fn update_document(
        &mut self,
        id: i64,
        title: Option<&str>,
        file_path: Option<&str>,
        media_type: Option<&str>,
        actor: &str,
    ) -> Result<(Document, ChangedFields)> {
        if let Some(t) = title {
            validate_title(t, "document")?;
        }
        let changed = self.mutate("update_document", actor, |tx, ctx| {
            let old = query_document(tx, id)?.ok_or(Error::DocumentNotFound { id })?;
            let mut changed = ChangedFields::new();
            let title = title.unwrap_or(&old.title);
            let file_path = file_path.unwrap_or(&old.file_path);
            let media_type = media_type.or(old.media_type.as_deref());
            if title != old.title {
                changed.insert(Field::Title);
            }
            if file_path != old.file_path {
                changed.insert(Field::FilePath);
            }
            if media_type != old.media_type.as_deref() {
                changed.insert(Field::MediaType);
            }
            tx.execute(
                "UPDATE documents SET title = ?1, file_path = ?2, media_type = ?3 WHERE id = ?4",
                rusqlite::params![title, file_path, media_type, id],
            )?;
            ctx.record_change(
                "document",
                &id.to_string(),
                EventType::DocumentUpdated,
                None,
                Some(describe_fields(&changed)),
            );
            Ok(changed)
        })?;
        let document = self.get_document(id)?.ok_or(Error::DocumentNotFound { id })?;
        Ok((document, changed))
    }

    // =================
    // Record Operations
    // =================

    /// Load any syncable record by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_record(&self, key: RecordKey) -> Result<Option<SyncableRecord>> {
        let record = match key.kind {
            RecordKind::Trail => self.get_trail(key.id)?.map(SyncableRecord::from),
            RecordKind::Knowledge => self.get_knowledge(key.id)?.map(SyncableRecord::from),
            RecordKind::Document => self.get_document(key.id)?.map(SyncableRecord::from),
        };
        Ok(record)
    }

    /// List every record of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_records(&self, kind: RecordKind) -> Result<Vec<SyncableRecord>> {
        let records = match kind {
            RecordKind::Trail => self.list_trails(None)?.into_iter().map(Into::into).collect(),
            RecordKind::Knowledge => self
                .list_knowledge(None)?
                .into_iter()
                .map(Into::into)
                .collect(),
            RecordKind::Document => self
                .list_documents(None)?
                .into_iter()
                .map(Into::into)
                .collect(),
        };
        Ok(records)
    }

    /// Delete a record, returning the row as it was.
    ///
    /// The record's `index_points` entry is kept so its identifier is never
    /// assigned again.
    ///
    /// # Errors
    ///
    /// Returns the kind's not-found error if the record doesn't exist.
    pub fn delete_record(&mut self, key: RecordKey, actor: &str) -> Result<SyncableRecord> {
        self.mutate("delete_record", actor, |tx, ctx| {
            let record = match key.kind {
                RecordKind::Trail => query_trail(tx, key.id)?.map(SyncableRecord::from),
                RecordKind::Knowledge => query_knowledge(tx, key.id)?.map(SyncableRecord::from),
                RecordKind::Document => query_document(tx, key.id)?.map(SyncableRecord::from),
            }
            .ok_or_else(|| key.kind.not_found(key.id))?;

            let sql = format!("DELETE FROM {} WHERE id = ?1", key.kind.table());
            tx.execute(&sql, [key.id])?;

            let event_type = match key.kind {
                RecordKind::Trail => EventType::TrailDeleted,
                RecordKind::Knowledge => EventType::KnowledgeDeleted,
                RecordKind::Document => EventType::DocumentDeleted,
            };
            ctx.record_change(
                key.kind.as_str(),
                &key.id.to_string(),
                event_type,
                Some(record.display_name().to_string()),
                None,
            );
            Ok(record)
        })
    }

    // =====================
    // Bookkeeping Operations
    // =====================

    /// Give a record its external-index id if it has none yet.
    ///
    /// The write only lands when the column is still NULL, so concurrent
    /// syncs of one record settle on a single id. Returns the id stored
    /// after the write, which is `candidate` unless another writer got
    /// there first.
    ///
    /// # Errors
    ///
    /// Returns the kind's not-found error if the record is gone.
    pub fn assign_external_index_id(
        &mut self,
        key: RecordKey,
        candidate: Uuid,
        actor: &str,
    ) -> Result<Uuid> {
        self.mutate("assign_external_index_id", actor, |tx, ctx| {
            let sql = format!(
                "UPDATE {} SET external_index_id = ?1 WHERE id = ?2 AND external_index_id IS NULL",
                key.kind.table()
            );
            let assigned = tx.execute(&sql, rusqlite::params![candidate.to_string(), key.id])?;

            if assigned == 1 {
                tx.execute(
                    "INSERT INTO index_points (point_id, record_kind, record_id, assigned_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![
                        candidate.to_string(),
                        key.kind.as_str(),
                        key.id,
                        chrono::Utc::now().timestamp_millis()
                    ],
                )?;
                ctx.record_change(
                    key.kind.as_str(),
                    &key.id.to_string(),
                    EventType::IndexIdAssigned,
                    None,
                    Some(candidate.to_string()),
                );
            }

            let sql = format!(
                "SELECT external_index_id FROM {} WHERE id = ?1",
                key.kind.table()
            );
            let stored: Option<Option<String>> = tx
                .query_row(&sql, [key.id], |row| row.get(0))
                .optional()?;
            let stored = stored.ok_or_else(|| key.kind.not_found(key.id))?;
            stored
                .as_deref()
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .ok_or_else(|| {
                    Error::Other(format!("{key} has no valid external index id after assignment"))
                })
        })
    }

    /// Flag a document as embedded and upserted.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if the document is gone.
    pub fn mark_document_processed(&mut self, id: i64, actor: &str) -> Result<()> {
        self.mutate("mark_document_processed", actor, |tx, ctx| {
            let updated = tx.execute("UPDATE documents SET processed = 1 WHERE id = ?1", [id])?;
            if updated == 0 {
                return Err(Error::DocumentNotFound { id });
            }
            ctx.record_event("document", &id.to_string(), EventType::DocumentProcessed);
            Ok(())
        })
    }

    /// Count indexed records per kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn sync_status(&self) -> Result<SyncStatus> {
        let kind_status = |kind: RecordKind| -> Result<KindStatus> {
            let sql = format!(
                "SELECT COUNT(*), COUNT(external_index_id) FROM {}",
                kind.table()
            );
            let (total, indexed): (i64, i64) = self
                .conn
                .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?;
            Ok(KindStatus {
                total: usize::try_from(total).unwrap_or_default(),
                indexed: usize::try_from(indexed).unwrap_or_default(),
            })
        };

        let processed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE processed = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(SyncStatus {
            trails: kind_status(RecordKind::Trail)?,
            knowledge: kind_status(RecordKind::Knowledge)?,
            documents: kind_status(RecordKind::Document)?,
            processed_documents: usize::try_from(processed).unwrap_or_default(),
        })
    }

    /// Most recent audit events, optionally for one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_events(&self, kind: Option<RecordKind>, limit: u32) -> Result<Vec<Event>> {
        Ok(recent_events(
            &self.conn,
            kind.as_ref().map(RecordKind::as_str),
            Some(limit),
        )?)
    }

    // ===============
    // Chat Operations
    // ===============

    /// Get a chat room by name, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or query fails.
    pub fn ensure_room(&mut self, name: &str) -> Result<ChatRoom> {
        self.conn.execute(
            "INSERT OR IGNORE INTO chat_rooms (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![name, chrono::Utc::now().timestamp_millis()],
        )?;
        let room = self.conn.query_row(
            "SELECT id, name, created_at FROM chat_rooms WHERE name = ?1",
            [name],
            |row| {
                Ok(ChatRoom {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )?;
        Ok(room)
    }

    /// Append a message to a room.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn add_message(&mut self, room_id: i64, author: &str, content: &str) -> Result<ChatMessage> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO chat_messages (room_id, author, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![room_id, author, content, now],
        )?;
        Ok(ChatMessage {
            id: self.conn.last_insert_rowid(),
            room_id,
            author: author.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// The last `limit` messages of a room, oldest first.
    ///
    /// An unknown room has no messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_messages(&self, room: &str, limit: Option<usize>) -> Result<Vec<ChatMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.room_id, m.author, m.content, m.created_at
             FROM chat_messages m
             JOIN chat_rooms r ON r.id = m.room_id
             WHERE r.name = ?1
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![room, sql_limit(limit)], |row| {
            Ok(ChatMessage {
                id: row.get(0)?,
                room_id: row.get(1)?,
                author: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let mut messages = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}

// `LIMIT -1` means no limit in SQLite.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

fn parse_index_id(raw: Option<String>) -> Option<Uuid> {
    raw.as_deref().and_then(|s| Uuid::parse_str(s).ok())
}

fn trail_changes(old: &Trail, new: &TrailDraft) -> ChangedFields {
    let mut changed = ChangedFields::new();
    let checks = [
        (Field::Label, old.label != new.label),
        (Field::Description, old.description != new.description),
        (Field::GpxPath, old.gpx_path != new.gpx_path),
        (Field::Difficulty, old.difficulty != new.difficulty),
        (Field::RouteType, old.route_type != new.route_type),
        (Field::Distance, old.distance != new.distance),
        (Field::Duration, old.duration != new.duration),
        (Field::Elevation, old.elevation != new.elevation),
    ];
    for (field, differs) in checks {
        if differs {
            changed.insert(field);
        }
    }
    changed
}

fn query_trail(conn: &Connection, id: i64) -> rusqlite::Result<Option<Trail>> {
    conn.query_row(
        &format!("SELECT {TRAIL_COLUMNS} FROM trails WHERE id = ?1"),
        [id],
        map_trail_row,
    )
    .optional()
}

fn query_knowledge(conn: &Connection, id: i64) -> rusqlite::Result<Option<KnowledgeEntry>> {
    conn.query_row(
        &format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_entries WHERE id = ?1"),
        [id],
        map_knowledge_row,
    )
    .optional()
}

fn query_document(conn: &Connection, id: i64) -> rusqlite::Result<Option<Document>> {
    conn.query_row(
        &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
        [id],
        map_document_row,
    )
    .optional()
}

// Helper to map trail rows
fn map_trail_row(row: &rusqlite::Row) -> rusqlite::Result<Trail> {
    let difficulty: String = row.get(4)?;
    let route_type: String = row.get(5)?;
    Ok(Trail {
        id: row.get(0)?,
        label: row.get(1)?,
        description: row.get(2)?,
        gpx_path: row.get(3)?,
        difficulty: difficulty.parse::<Difficulty>().unwrap_or_default(),
        route_type: route_type.parse::<RouteType>().unwrap_or_default(),
        distance: row.get(6)?,
        duration: row.get(7)?,
        elevation: row.get(8)?,
        external_index_id: parse_index_id(row.get(9)?),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn map_knowledge_row(row: &rusqlite::Row) -> rusqlite::Result<KnowledgeEntry> {
    Ok(KnowledgeEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        external_index_id: parse_index_id(row.get(3)?),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_document_row(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        file_path: row.get(2)?,
        media_type: row.get(3)?,
        external_index_id: parse_index_id(row.get(4)?),
        processed: row.get(5)?,
        uploaded_at: row.get(6)?,
    })
}
