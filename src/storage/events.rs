//! Audit event storage and retrieval.
//!
//! Events track catalog mutations and sync bookkeeping for debugging and
//! for `gt sync status`.

use rusqlite::{Connection, Result};

/// Event types for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    // Trail events
    TrailCreated,
    TrailUpdated,
    TrailDeleted,

    // Knowledge events
    KnowledgeCreated,
    KnowledgeUpdated,
    KnowledgeDeleted,

    // Document events
    DocumentCreated,
    DocumentUpdated,
    DocumentDeleted,

    // Sync bookkeeping
    IndexIdAssigned,
    DocumentProcessed,
}

impl EventType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TrailCreated => "trail_created",
            Self::TrailUpdated => "trail_updated",
            Self::TrailDeleted => "trail_deleted",
            Self::KnowledgeCreated => "knowledge_created",
            Self::KnowledgeUpdated => "knowledge_updated",
            Self::KnowledgeDeleted => "knowledge_deleted",
            Self::DocumentCreated => "document_created",
            Self::DocumentUpdated => "document_updated",
            Self::DocumentDeleted => "document_deleted",
            Self::IndexIdAssigned => "index_id_assigned",
            Self::DocumentProcessed => "document_processed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let event_type = match s {
            "trail_created" => Self::TrailCreated,
            "trail_updated" => Self::TrailUpdated,
            "trail_deleted" => Self::TrailDeleted,
            "knowledge_created" => Self::KnowledgeCreated,
            "knowledge_updated" => Self::KnowledgeUpdated,
            "knowledge_deleted" => Self::KnowledgeDeleted,
            "document_created" => Self::DocumentCreated,
            "document_updated" => Self::DocumentUpdated,
            "document_deleted" => Self::DocumentDeleted,
            "index_id_assigned" => Self::IndexIdAssigned,
            "document_processed" => Self::DocumentProcessed,
            _ => return None,
        };
        Some(event_type)
    }
}

/// An audit event record.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: i64,
}

impl Event {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(entity_type: &str, entity_id: &str, event_type: EventType, actor: &str) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type,
            actor: actor.to_string(),
            old_value: None,
            new_value: None,
            comment: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Add old/new values for field change tracking.
    #[must_use]
    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    /// Add a comment to the event.
    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Insert an event into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<i64> {
    conn.execute(
        "INSERT INTO events (entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            event.entity_type,
            event.entity_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get the most recent events, optionally for one entity type.
///
/// Rows with an unknown event type are skipped.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn recent_events(
    conn: &Connection,
    entity_type: Option<&str>,
    limit: Option<u32>,
) -> Result<Vec<Event>> {
    let limit = limit.unwrap_or(20);
    let mut stmt = conn.prepare(
        "SELECT id, entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at
         FROM events
         WHERE ?1 IS NULL OR entity_type = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(rusqlite::params![entity_type, limit], |row| {
        let raw_type: String = row.get(3)?;
        Ok(EventType::parse(&raw_type).map(|event_type| Event {
            id: row.get(0).unwrap_or_default(),
            entity_type: row.get(1).unwrap_or_default(),
            entity_id: row.get(2).unwrap_or_default(),
            event_type,
            actor: row.get(4).unwrap_or_default(),
            old_value: row.get(5).unwrap_or_default(),
            new_value: row.get(6).unwrap_or_default(),
            comment: row.get(7).unwrap_or_default(),
            created_at: row.get(8).unwrap_or_default(),
        }))
    })?;

    let mut events = Vec::new();
    for row in rows {
        if let Some(event) = row? {
            events.push(event);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_event_insert_and_recent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let event = Event::new("trail", "1", EventType::TrailCreated, "admin")
            .with_comment("Trilha do Pico");
        let id = insert_event(&conn, &event).unwrap();
        assert!(id > 0);

        insert_event(
            &conn,
            &Event::new("knowledge", "2", EventType::IndexIdAssigned, "sync")
                .with_values(None, Some("a-uuid".to_string())),
        )
        .unwrap();

        let all = recent_events(&conn, None, Some(10)).unwrap();
        assert_eq!(all.len(), 2);

        let trails = recent_events(&conn, Some("trail"), Some(10)).unwrap();
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].actor, "admin");
        assert_eq!(trails[0].event_type, EventType::TrailCreated);
        assert_eq!(trails[0].comment.as_deref(), Some("Trilha do Pico"));
    }
}
