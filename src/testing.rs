//! Test doubles for the embedding, index and generative services.

use crate::embeddings::{EmbeddingProvider, ProviderInfo};
use crate::error::{Error, Result};
use crate::genai::{GenerativeModel, UploadedFile};
use crate::vector::{Distance, Filter, MemoryIndex, Point, ScoredPoint, VectorIndex};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Deterministic embedder: byte histogram folded into `dimensions` buckets.
///
/// Clones share their counters, so a test can box one clone and inspect
/// another.
#[derive(Clone)]
pub struct FakeEmbedder {
    dimensions: usize,
    fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    inputs: Arc<Mutex<Vec<String>>>,
    delay_secs: Arc<AtomicU64>,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
            inputs: Arc::new(Mutex::new(Vec::new())),
            delay_secs: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Make every embedding call take this long.
    pub fn set_delay_secs(&self, secs: u64) {
        self.delay_secs.store(secs, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        vector[0] = 1.0;
        for (i, byte) in text.bytes().enumerate() {
            vector[(i + byte as usize) % self.dimensions] += f32::from(byte) / 255.0;
        }
        vector
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "fake".to_string(),
            model: "fake-embed".to_string(),
            dimensions: self.dimensions,
            max_chars: 9000,
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        let delay = self.delay_secs.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Embedding("fake embedder down".into()));
        }
        Ok(self.vector_for(text))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    CreateCollection(String),
    Upsert(Vec<Uuid>),
    Query,
    Delete(Vec<Uuid>),
}

/// In-memory index that records every call.
#[derive(Default)]
pub struct RecordingIndex {
    pub inner: MemoryIndex,
    ops: Mutex<Vec<IndexOp>>,
    fail_upsert: AtomicBool,
    fail_delete: AtomicBool,
}

impl RecordingIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<IndexOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Vec<Uuid>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                IndexOp::Delete(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    pub fn upserts(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, IndexOp::Upsert(_)))
            .count()
    }

    pub fn set_fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn record(&self, op: IndexOp) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        self.inner.collection_exists(collection).await
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()> {
        self.record(IndexOp::CreateCollection(collection.to_string()));
        self.inner
            .create_collection(collection, dimensions, distance)
            .await
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        self.record(IndexOp::Upsert(points.iter().map(|p| p.id).collect()));
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(Error::VectorIndex("fake index down".into()));
        }
        self.inner.upsert(collection, points).await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        self.record(IndexOp::Query);
        self.inner.query(collection, vector, filter, limit).await
    }

    async fn delete(&self, collection: &str, ids: &[Uuid]) -> Result<()> {
        self.record(IndexOp::Delete(ids.to_vec()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::VectorIndex("fake index down".into()));
        }
        self.inner.delete(collection, ids).await
    }
}

/// Generative model with a canned reply.
#[derive(Clone)]
pub struct FakeGenerator {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
    uploads: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl FakeGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Arc::new(Mutex::new(Vec::new())),
            uploads: Arc::new(AtomicUsize::new(0)),
            deletes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(UploadedFile {
            name: format!("files/{}", path.display()),
            uri: format!("fake://{}", path.display()),
            mime_type: mime_type.to_string(),
        })
    }

    async fn generate_with_file(&self, _file: &UploadedFile, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn delete_file(&self, _file: &UploadedFile) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
