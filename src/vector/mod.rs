//! Vector index abstraction.
//!
//! Knowledge points (one per synced record) and chat memory points share a
//! single collection. Only knowledge points carry `is_knowledge = true`,
//! which is what retrieval filters on.

pub mod memory;
pub mod qdrant;

use crate::config::ResolvedConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

/// `QDRANT_URL` value selecting the in-process index.
pub const MEMORY_URL: &str = "memory:";

/// Payload key marking points eligible for retrieval.
pub const KNOWLEDGE_FLAG: &str = "is_knowledge";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Cosine,
}

/// Point payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_knowledge: bool,
}

impl Payload {
    /// Payload for a synced record: retrievable, labelled with its source.
    #[must_use]
    pub fn knowledge(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: Some(source.into()),
            is_knowledge: true,
        }
    }

    /// Payload for a chat memory: the question text only, never retrieved.
    #[must_use]
    pub fn memory(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
            is_knowledge: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: Uuid,
    pub score: f32,
    pub payload: Payload,
}

/// Exact-match conditions on payload keys, all of which must hold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    pub must: Vec<(String, serde_json::Value)>,
}

impl Filter {
    /// Match points with `is_knowledge == true`.
    #[must_use]
    pub fn knowledge_only() -> Self {
        Self {
            must: vec![(KNOWLEDGE_FLAG.to_string(), serde_json::Value::Bool(true))],
        }
    }

    /// Whether a payload satisfies every condition.
    #[must_use]
    pub fn matches(&self, payload: &Payload) -> bool {
        let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(payload) else {
            return false;
        };
        self.must.iter().all(|(key, expected)| {
            let actual = fields.get(key).cloned().unwrap_or(match expected {
                // Absent flags serialize as false
                serde_json::Value::Bool(_) => serde_json::Value::Bool(false),
                _ => serde_json::Value::Null,
            });
            &actual == expected
        })
    }
}

/// Vector store backend.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Create a collection. Creating one that already exists is not an error.
    async fn create_collection(
        &self,
        collection: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()>;

    /// Insert or overwrite points by id.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// Nearest points to `vector`, best first.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;

    /// Delete points by id. Missing points are ignored.
    async fn delete(&self, collection: &str, ids: &[Uuid]) -> Result<()>;
}

/// Create `collection` with cosine distance unless it already exists.
///
/// # Errors
///
/// Returns `VectorIndex` if the backend fails.
pub async fn ensure_collection(
    index: &dyn VectorIndex,
    collection: &str,
    dimensions: usize,
) -> Result<()> {
    if !index.collection_exists(collection).await? {
        tracing::info!(collection, dimensions, "Creating vector collection");
        index
            .create_collection(collection, dimensions, Distance::Cosine)
            .await?;
    }
    Ok(())
}

/// Open the configured index: Qdrant, or the in-process index for
/// `QDRANT_URL=memory:`.
///
/// # Errors
///
/// Returns `Http` if the Qdrant client cannot be built.
pub fn open_index(config: &ResolvedConfig) -> Result<Arc<dyn VectorIndex>> {
    if config.qdrant_url.trim() == MEMORY_URL {
        return Ok(Arc::new(MemoryIndex::new()));
    }
    Ok(Arc::new(QdrantIndex::new(
        &config.qdrant_url,
        config.qdrant_api_key.clone(),
        crate::http::RetryPolicy::from_config(config),
    )?))
}
