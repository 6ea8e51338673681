//! Sync orchestration: extract, identify, embed, upsert, write back.

use super::extract::{extract, truncate_chars, MAX_EMBED_CHARS};
use super::scheduler::SyncRunner;
use crate::embeddings::BoxedProvider;
use crate::error::{Error, Result};
use crate::genai::GenerativeModel;
use crate::model::{RecordKey, SyncableRecord};
use crate::storage::{lock, SharedStorage};
use crate::vector::{ensure_collection, Payload, Point, VectorIndex};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Actor recorded on the pipeline's own write-backs.
pub const SYNC_ACTOR: &str = "sync";

/// Result of one successful sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The record's point was upserted under this id.
    Synced(Uuid),
    /// Nothing to index; no side effects.
    NoContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub record: String,
    pub error: String,
}

/// Summary of a forced sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForceSyncReport {
    pub synced: usize,
    pub skipped: usize,
    pub errors: Vec<SyncFailure>,
}

impl ForceSyncReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.synced + self.skipped + self.errors.len()
    }
}

pub struct SyncOrchestrator {
    store: SharedStorage,
    embedder: Arc<BoxedProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Option<Arc<dyn GenerativeModel>>,
    collection: String,
    dimensions: usize,
}

impl SyncOrchestrator {
    /// `generator` is only needed for PDF documents.
    #[must_use]
    pub fn new(
        store: SharedStorage,
        embedder: Arc<BoxedProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Option<Arc<dyn GenerativeModel>>,
        collection: &str,
        dimensions: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            generator,
            collection: collection.to_string(),
            dimensions,
        }
    }

    /// Mirror one record into the index.
    ///
    /// The record's id is stored before embedding, so it survives an
    /// embedding or upsert failure; documents are flagged processed only
    /// after a confirmed upsert.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. Nothing is retried here.
    pub async fn sync(&self, record: &SyncableRecord) -> Result<SyncOutcome> {
        let key = record.key();
        let Some(extracted) = extract(record, self.generator.as_deref()).await? else {
            debug!(record = %key, "No content to index");
            return Ok(SyncOutcome::NoContent);
        };

        let point_id = match record.external_index_id() {
            Some(id) => id,
            None => self.assign_id(key)?,
        };

        let text = truncate_chars(&extracted.text, MAX_EMBED_CHARS);
        let vector = self.embedder.generate_embedding(text).await?;
        if vector.len() != self.dimensions {
            return Err(Error::Embedding(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }

        ensure_collection(self.index.as_ref(), &self.collection, self.dimensions).await?;
        let point = Point {
            id: point_id,
            vector,
            payload: Payload::knowledge(extracted.text, extracted.source),
        };
        self.index.upsert(&self.collection, vec![point]).await?;

        // The row may have been deleted while we were embedding; its delete
        // hook could have run before the upsert landed
        if lock(&self.store)?.get_record(key)?.is_none() {
            warn!(record = %key, %point_id, "Record deleted during sync, removing point");
            self.index.delete(&self.collection, &[point_id]).await?;
            return Err(key.kind.not_found(key.id));
        }

        if let SyncableRecord::Document(document) = record {
            lock(&self.store)?.mark_document_processed(document.id, SYNC_ACTOR)?;
        }
        Ok(SyncOutcome::Synced(point_id))
    }

    fn assign_id(&self, key: RecordKey) -> Result<Uuid> {
        let id = lock(&self.store)?.assign_external_index_id(key, Uuid::new_v4(), SYNC_ACTOR)?;
        debug!(record = %key, point_id = %id, "Assigned index id");
        Ok(id)
    }

    /// Sync records now, bypassing the scheduler, and report per record.
    pub async fn force_sync(&self, records: Vec<SyncableRecord>) -> ForceSyncReport {
        let mut report = ForceSyncReport::default();
        for record in records {
            match self.sync(&record).await {
                Ok(SyncOutcome::Synced(point_id)) => {
                    info!(record = %record.key(), %point_id, "Forced sync succeeded");
                    report.synced += 1;
                }
                Ok(SyncOutcome::NoContent) => report.skipped += 1,
                Err(e) => {
                    warn!(record = %record.key(), error = %e, "Forced sync failed");
                    report.errors.push(SyncFailure {
                        record: record.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

#[async_trait]
impl SyncRunner for SyncOrchestrator {
    async fn run(&self, record: SyncableRecord) {
        match self.sync(&record).await {
            Ok(SyncOutcome::Synced(point_id)) => {
                info!(record = %record.key(), %point_id, "Synced record");
            }
            Ok(SyncOutcome::NoContent) => {}
            Err(e) => warn!(record = %record.key(), error = %e, "Sync failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, RecordKind, TrailDraft};
    use crate::storage::{shared, SqliteStorage};
    use crate::testing::{FakeEmbedder, FakeGenerator, IndexOp, RecordingIndex};
    use std::io::Write;

    const DIMS: usize = 8;
    const COLLECTION: &str = "chatbot_memory";

    struct Fixture {
        store: SharedStorage,
        embedder: FakeEmbedder,
        index: Arc<RecordingIndex>,
        generator: FakeGenerator,
        orchestrator: SyncOrchestrator,
    }

    fn fixture() -> Fixture {
        let store = shared(SqliteStorage::open_memory().unwrap());
        let embedder = FakeEmbedder::new(DIMS);
        let index = RecordingIndex::new();
        let generator = FakeGenerator::new("Texto do PDF");
        let orchestrator = SyncOrchestrator::new(
            store.clone(),
            Arc::new(BoxedProvider::new(embedder.clone())),
            index.clone(),
            Some(Arc::new(generator.clone())),
            COLLECTION,
            DIMS,
        );
        Fixture {
            store,
            embedder,
            index,
            generator,
            orchestrator,
        }
    }

    fn knowledge(f: &Fixture, content: &str) -> SyncableRecord {
        lock(&f.store)
            .unwrap()
            .create_knowledge("Horários", content, "admin")
            .unwrap()
            .into()
    }

    fn reload(f: &Fixture, key: RecordKey) -> SyncableRecord {
        lock(&f.store).unwrap().get_record(key).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_knowledge_sync_creates_retrievable_point() {
        let f = fixture();
        let record = knowledge(&f, "Parque X fica aberto das 8h às 18h.");

        let SyncOutcome::Synced(point_id) = f.orchestrator.sync(&record).await.unwrap() else {
            panic!("expected a synced outcome");
        };

        assert_eq!(reload(&f, record.key()).external_index_id(), Some(point_id));
        let point = f.index.inner.get(COLLECTION, point_id).unwrap();
        assert!(point.payload.is_knowledge);
        assert_eq!(point.payload.content, "Parque X fica aberto das 8h às 18h.");
        assert_eq!(point.payload.source.as_deref(), Some("Knowledge: Horários"));
    }

    #[tokio::test]
    async fn test_second_sync_reuses_id() {
        let f = fixture();
        let record = knowledge(&f, "Aberto das 8h");

        let first = f.orchestrator.sync(&record).await.unwrap();
        // A stale snapshot without the id must not mint a second one
        let second = f.orchestrator.sync(&record).await.unwrap();
        let third = f
            .orchestrator
            .sync(&reload(&f, record.key()))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(f.index.inner.len(COLLECTION), 1);
    }

    #[tokio::test]
    async fn test_image_document_is_skipped() {
        let f = fixture();
        let record: SyncableRecord = lock(&f.store)
            .unwrap()
            .create_document("Foto", "uploads/foto.png", Some("image/png"), "admin")
            .unwrap()
            .into();

        assert_eq!(f.orchestrator.sync(&record).await.unwrap(), SyncOutcome::NoContent);
        assert_eq!(f.embedder.calls(), 0);
        let SyncableRecord::Document(document) = reload(&f, record.key()) else {
            unreachable!()
        };
        assert!(!document.processed);
        assert_eq!(document.external_index_id, None);
    }

    #[tokio::test]
    async fn test_document_marked_processed_after_upsert() {
        let f = fixture();
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Leve água.").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let record: SyncableRecord = lock(&f.store)
            .unwrap()
            .create_document("Guia", &path, None, "admin")
            .unwrap()
            .into();

        f.orchestrator.sync(&record).await.unwrap();

        let SyncableRecord::Document(document) = reload(&f, record.key()) else {
            unreachable!()
        };
        assert!(document.processed);
        assert!(document.external_index_id.is_some());
    }

    #[tokio::test]
    async fn test_pdf_document_is_transcribed() {
        let f = fixture();
        let record: SyncableRecord = lock(&f.store)
            .unwrap()
            .create_document("Mapa", "uploads/mapa.pdf", None, "admin")
            .unwrap()
            .into();

        let SyncOutcome::Synced(point_id) = f.orchestrator.sync(&record).await.unwrap() else {
            panic!("expected a synced outcome");
        };
        assert_eq!(f.generator.uploads(), 1);
        assert_eq!(f.generator.deletes(), 1);
        assert_eq!(
            f.index.inner.get(COLLECTION, point_id).unwrap().payload.content,
            "Texto do PDF"
        );
    }

    #[tokio::test]
    async fn test_upsert_failure_keeps_id_but_not_processed() {
        let f = fixture();
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Leve água.").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let record: SyncableRecord = lock(&f.store)
            .unwrap()
            .create_document("Guia", &path, None, "admin")
            .unwrap()
            .into();
        f.index.set_fail_upsert(true);

        assert!(matches!(
            f.orchestrator.sync(&record).await,
            Err(Error::VectorIndex(_))
        ));
        let SyncableRecord::Document(document) = reload(&f, record.key()) else {
            unreachable!()
        };
        assert!(document.external_index_id.is_some());
        assert!(!document.processed);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_index() {
        let f = fixture();
        let record = knowledge(&f, "Aberto");
        f.embedder.set_failing(true);

        assert!(matches!(
            f.orchestrator.sync(&record).await,
            Err(Error::Embedding(_))
        ));
        assert_eq!(f.index.upserts(), 0);
        assert!(reload(&f, record.key()).external_index_id().is_some());
    }

    #[tokio::test]
    async fn test_long_text_is_truncated_for_embedding_only() {
        let f = fixture();
        let content = "a".repeat(MAX_EMBED_CHARS + 100);
        let record = knowledge(&f, &content);

        let SyncOutcome::Synced(point_id) = f.orchestrator.sync(&record).await.unwrap() else {
            panic!("expected a synced outcome");
        };
        assert_eq!(f.embedder.inputs()[0].len(), MAX_EMBED_CHARS);
        assert_eq!(
            f.index.inner.get(COLLECTION, point_id).unwrap().payload.content.len(),
            MAX_EMBED_CHARS + 100
        );
    }

    #[tokio::test]
    async fn test_collection_created_once() {
        let f = fixture();
        let a = knowledge(&f, "a");
        let b = knowledge(&f, "b");
        f.orchestrator.sync(&a).await.unwrap();
        f.orchestrator.sync(&b).await.unwrap();

        let creates = f
            .index
            .ops()
            .into_iter()
            .filter(|op| matches!(op, IndexOp::CreateCollection(_)))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_deleted_row_aborts_before_embedding() {
        let f = fixture();
        let record = knowledge(&f, "Aberto");
        lock(&f.store)
            .unwrap()
            .delete_record(record.key(), "admin")
            .unwrap();

        assert!(matches!(
            f.orchestrator.sync(&record).await,
            Err(Error::KnowledgeNotFound { .. })
        ));
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_deleted_during_embedding_leaves_no_point() {
        let f = fixture();
        let record = knowledge(&f, "Aberto das 8h");
        f.embedder.set_delay_secs(10);

        let (result, _) = tokio::join!(f.orchestrator.sync(&record), async {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            lock(&f.store)
                .unwrap()
                .delete_record(record.key(), "admin")
                .unwrap();
        });

        assert!(matches!(result, Err(Error::KnowledgeNotFound { .. })));
        assert_eq!(f.index.upserts(), 1);
        assert_eq!(f.index.deletes().len(), 1);
        assert_eq!(f.index.inner.len(COLLECTION), 0);
    }

    #[tokio::test]
    async fn test_force_sync_report() {
        let f = fixture();
        let trail: SyncableRecord = lock(&f.store)
            .unwrap()
            .create_trail(
                &TrailDraft {
                    label: "Trilha do Pico".to_string(),
                    gpx_path: "trackfiles/pico.gpx".to_string(),
                    difficulty: Difficulty::Easy,
                    ..TrailDraft::default()
                },
                "admin",
            )
            .unwrap()
            .into();
        let image: SyncableRecord = lock(&f.store)
            .unwrap()
            .create_document("Foto", "uploads/foto.png", None, "admin")
            .unwrap()
            .into();
        let missing: SyncableRecord = lock(&f.store)
            .unwrap()
            .create_document("Sumiu", "/nonexistent/sumiu.txt", None, "admin")
            .unwrap()
            .into();

        let report = f.orchestrator.force_sync(vec![trail, image, missing]).await;
        assert_eq!(report.synced, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].record.starts_with(&format!("{}-", RecordKind::Document)));
        assert_eq!(report.total(), 3);
    }
}
