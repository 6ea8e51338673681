//! Records mirrored into the vector index.
//!
//! [`SyncableRecord`] is the closed set of content-bearing records the sync
//! pipeline watches. Each record addresses at most one vector point through
//! its external-index identifier.

use super::{Document, KnowledgeEntry, Trail};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Kind of syncable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Trail,
    Knowledge,
    Document,
}

impl RecordKind {
    /// All kinds, in sync order.
    pub const ALL: [Self; 3] = [Self::Trail, Self::Knowledge, Self::Document];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trail => "trail",
            Self::Knowledge => "knowledge",
            Self::Document => "document",
        }
    }

    /// Table holding records of this kind.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Trail => "trails",
            Self::Knowledge => "knowledge_entries",
            Self::Document => "documents",
        }
    }

    /// The not-found error for a record of this kind.
    #[must_use]
    pub fn not_found(&self, id: i64) -> Error {
        match self {
            Self::Trail => Error::TrailNotFound { id },
            Self::Knowledge => Error::KnowledgeNotFound { id },
            Self::Document => Error::DocumentNotFound { id },
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trail" | "trails" | "track" | "tracks" => Ok(Self::Trail),
            "knowledge" | "kb" => Ok(Self::Knowledge),
            "document" | "documents" | "doc" | "docs" => Ok(Self::Document),
            _ => Err(Error::InvalidArgument(format!("unknown record kind: {s}"))),
        }
    }
}

/// Identity of a record across kinds: `(kind, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub kind: RecordKind,
    pub id: i64,
}

impl RecordKey {
    #[must_use]
    pub const fn new(kind: RecordKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

/// Persisted record fields, as reported in change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Label,
    Description,
    GpxPath,
    Difficulty,
    RouteType,
    Distance,
    Duration,
    Elevation,
    Title,
    Content,
    FilePath,
    MediaType,
    ExternalIndexId,
    Processed,
}

impl Field {
    /// Fields written only by the sync pipeline itself.
    pub const BOOKKEEPING: [Self; 2] = [Self::ExternalIndexId, Self::Processed];

    #[must_use]
    pub fn is_bookkeeping(self) -> bool {
        Self::BOOKKEEPING.contains(&self)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Description => "description",
            Self::GpxPath => "gpx_path",
            Self::Difficulty => "difficulty",
            Self::RouteType => "route_type",
            Self::Distance => "distance",
            Self::Duration => "duration",
            Self::Elevation => "elevation",
            Self::Title => "title",
            Self::Content => "content",
            Self::FilePath => "file_path",
            Self::MediaType => "media_type",
            Self::ExternalIndexId => "external_index_id",
            Self::Processed => "processed",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join field names with commas, for logs and audit values.
#[must_use]
pub fn describe_fields(fields: &ChangedFields) -> String {
    fields.iter().map(Field::as_str).collect::<Vec<_>>().join(",")
}

/// Set of changed fields for one write.
pub type ChangedFields = BTreeSet<Field>;

/// A record whose content is mirrored into the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncableRecord {
    Trail(Trail),
    Knowledge(KnowledgeEntry),
    Document(Document),
}

impl SyncableRecord {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Trail(_) => RecordKind::Trail,
            Self::Knowledge(_) => RecordKind::Knowledge,
            Self::Document(_) => RecordKind::Document,
        }
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Trail(t) => t.id,
            Self::Knowledge(k) => k.id,
            Self::Document(d) => d.id,
        }
    }

    #[must_use]
    pub const fn key(&self) -> RecordKey {
        RecordKey::new(self.kind(), self.id())
    }

    #[must_use]
    pub const fn external_index_id(&self) -> Option<Uuid> {
        match self {
            Self::Trail(t) => t.external_index_id,
            Self::Knowledge(k) => k.external_index_id,
            Self::Document(d) => d.external_index_id,
        }
    }

    /// Short human-readable name (label or title).
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Trail(t) => &t.label,
            Self::Knowledge(k) => &k.title,
            Self::Document(d) => &d.title,
        }
    }
}

impl fmt::Display for SyncableRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.key(), self.display_name())
    }
}

impl From<Trail> for SyncableRecord {
    fn from(t: Trail) -> Self {
        Self::Trail(t)
    }
}

impl From<KnowledgeEntry> for SyncableRecord {
    fn from(k: KnowledgeEntry) -> Self {
        Self::Knowledge(k)
    }
}

impl From<Document> for SyncableRecord {
    fn from(d: Document) -> Self {
        Self::Document(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_display() {
        assert_eq!(RecordKey::new(RecordKind::Trail, 3).to_string(), "trail-3");
        assert_eq!(RecordKey::new(RecordKind::Knowledge, 12).to_string(), "knowledge-12");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Trails".parse::<RecordKind>().unwrap(), RecordKind::Trail);
        assert_eq!("doc".parse::<RecordKind>().unwrap(), RecordKind::Document);
        assert!("post".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_bookkeeping_fields() {
        assert!(Field::ExternalIndexId.is_bookkeeping());
        assert!(Field::Processed.is_bookkeeping());
        assert!(!Field::Content.is_bookkeeping());
    }

    #[test]
    fn test_record_identity() {
        let record = SyncableRecord::Knowledge(KnowledgeEntry {
            id: 4,
            title: "Horários".to_string(),
            content: "Aberto".to_string(),
            external_index_id: None,
            created_at: 0,
            updated_at: 0,
        });
        assert_eq!(record.external_index_id(), None);
        assert_eq!(record.key(), RecordKey::new(RecordKind::Knowledge, 4));
        assert_eq!(record.display_name(), "Horários");
    }
}
