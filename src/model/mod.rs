//! Data models for Green Trail.
//!
//! This module contains all domain models:
//! - Trail
//! - KnowledgeEntry
//! - Document
//! - SyncableRecord (the sum of the three, as seen by the sync pipeline)
//! - ChatRoom / ChatMessage

pub mod chat;
pub mod document;
pub mod knowledge;
pub mod record;
pub mod trail;

pub use chat::{ChatMessage, ChatRoom, BOT_AUTHOR};
pub use document::{guess_media_type, Document, PDF_MEDIA_TYPE};
pub use knowledge::{validate_title, KnowledgeEntry, MAX_TITLE_LEN};
pub use record::{describe_fields, ChangedFields, Field, RecordKey, RecordKind, SyncableRecord};
pub use trail::{Difficulty, RouteType, Trail, TrailDraft};
