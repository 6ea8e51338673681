//! Service wiring.
//!
//! [`Services`] holds the external clients (embedder, vector index,
//! generative model) built from resolved settings, and hands out the sync
//! orchestrator, a catalog-attached scheduler, and the chat service.

use crate::catalog::Catalog;
use crate::chat::ChatService;
use crate::config::ResolvedConfig;
use crate::embeddings::{create_embedding_provider, BoxedProvider, ProviderInfo};
use crate::error::{Error, Result};
use crate::genai::{GeminiClient, GenerativeModel};
use crate::storage::SharedStorage;
use crate::sync::{ChangeNotifier, DebounceScheduler, SyncOrchestrator};
use crate::vector::{open_index, VectorIndex};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

pub struct Services {
    store: SharedStorage,
    embedder: Arc<BoxedProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Option<Arc<dyn GenerativeModel>>,
    collection: String,
    dimensions: usize,
    sync_delay: Duration,
}

impl Services {
    /// Build the configured clients.
    ///
    /// The generative model is optional: without a Gemini key, trails and
    /// knowledge entries still sync, while PDFs and chat fail with a
    /// configuration error.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the embedding provider is misconfigured.
    pub fn from_config(config: &ResolvedConfig, store: SharedStorage) -> Result<Self> {
        let embedder = Arc::new(create_embedding_provider(config)?);
        let index = open_index(config)?;
        let generator: Option<Arc<dyn GenerativeModel>> = if config.gemini_api_key.is_some() {
            Some(Arc::new(GeminiClient::from_config(config)?))
        } else {
            debug!("No Gemini API key; generation disabled");
            None
        };
        Ok(Self {
            store,
            embedder,
            index,
            generator,
            collection: config.collection.clone(),
            dimensions: config.vector_size,
            sync_delay: config.sync_delay(),
        })
    }

    #[must_use]
    pub fn new(
        store: SharedStorage,
        embedder: Arc<BoxedProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Option<Arc<dyn GenerativeModel>>,
        collection: &str,
        dimensions: usize,
        sync_delay: Duration,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            generator,
            collection: collection.to_string(),
            dimensions,
            sync_delay,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SharedStorage {
        &self.store
    }

    #[must_use]
    pub fn embedder_info(&self) -> ProviderInfo {
        self.embedder.info()
    }

    /// Whether the embedding provider answers right now.
    pub async fn embedder_available(&self) -> bool {
        self.embedder.is_available().await
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
        Arc::new(SyncOrchestrator::new(
            self.store.clone(),
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            self.generator.clone(),
            &self.collection,
            self.dimensions,
        ))
    }

    /// Subscribe a change notifier to `catalog` and return its scheduler.
    pub fn attach(&self, catalog: &mut Catalog, runtime: Handle) -> DebounceScheduler {
        let scheduler = DebounceScheduler::new(runtime, self.orchestrator(), self.sync_delay);
        catalog.subscribe(Arc::new(ChangeNotifier::new(
            scheduler.clone(),
            Arc::clone(&self.index),
            &self.collection,
        )));
        scheduler
    }

    /// The chat service.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no generative model is configured.
    pub fn chat(&self) -> Result<ChatService> {
        let generator = self
            .generator
            .clone()
            .ok_or_else(|| Error::Config("chat needs GEMINI_API_KEY".into()))?;
        Ok(ChatService::new(
            self.store.clone(),
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            generator,
            &self.collection,
            self.dimensions,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecordKey, RecordKind, SyncableRecord};
    use crate::storage::{lock, shared, SqliteStorage};
    use crate::testing::{FakeEmbedder, RecordingIndex};

    const DIMS: usize = 8;

    struct Fixture {
        catalog: Catalog,
        scheduler: DebounceScheduler,
        embedder: FakeEmbedder,
        index: Arc<RecordingIndex>,
    }

    fn fixture() -> Fixture {
        fixture_with_delay(300)
    }

    fn fixture_with_delay(delay_secs: u64) -> Fixture {
        let store = shared(SqliteStorage::open_memory().unwrap());
        let embedder = FakeEmbedder::new(DIMS);
        let index = RecordingIndex::new();
        let services = Services::new(
            store.clone(),
            Arc::new(BoxedProvider::new(embedder.clone())),
            index.clone(),
            None,
            "chatbot_memory",
            DIMS,
            Duration::from_secs(delay_secs),
        );
        let mut catalog = Catalog::new(store, "admin");
        let scheduler = services.attach(&mut catalog, Handle::current());
        Fixture {
            catalog,
            scheduler,
            embedder,
            index,
        }
    }

    fn stored(f: &Fixture, key: RecordKey) -> SyncableRecord {
        lock(f.catalog.store()).unwrap().get_record(key).unwrap().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_coalesce_into_one_sync() {
        let f = fixture();
        let entry = f.catalog.create_knowledge("Horários", "Aberto das 8h").unwrap();
        for hour in [17, 18, 19] {
            f.catalog
                .update_knowledge(entry.id, None, Some(format!("Aberto das 8h às {hour}h").as_str()))
                .unwrap();
        }
        assert_eq!(f.scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_secs(301)).await;
        tokio::task::yield_now().await;

        assert_eq!(f.embedder.inputs(), vec!["Aberto das 8h às 19h".to_string()]);
        let key = RecordKey::new(RecordKind::Knowledge, entry.id);
        assert!(stored(&f, key).external_index_id().is_some());
        // Write-backs did not schedule another run
        assert_eq!(f.scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_write_backs_do_not_reschedule() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guia.txt");
        std::fs::write(&path, "Leve água.").unwrap();
        let document = f
            .catalog
            .create_document("Guia", &path.to_string_lossy(), None)
            .unwrap();

        assert_eq!(f.scheduler.flush().await, 1);

        let SyncableRecord::Document(document) =
            stored(&f, RecordKey::new(RecordKind::Document, document.id))
        else {
            unreachable!()
        };
        assert!(document.processed);
        assert_eq!(f.scheduler.pending(), 0);
        assert_eq!(f.embedder.calls(), 1);

        let events = lock(f.catalog.store())
            .unwrap()
            .recent_events(Some(RecordKind::Document), 10)
            .unwrap();
        assert!(events.iter().any(|e| e.actor == "sync"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_removes_point_before_row() {
        let f = fixture();
        let entry = f.catalog.create_knowledge("Horários", "Aberto").unwrap();
        f.scheduler.flush().await;
        let key = RecordKey::new(RecordKind::Knowledge, entry.id);
        let point_id = stored(&f, key).external_index_id().unwrap();

        f.catalog.delete(key).await.unwrap();

        assert_eq!(f.index.deletes(), vec![vec![point_id]]);
        assert!(f.index.inner.get("chatbot_memory", point_id).is_none());
        assert!(lock(f.catalog.store()).unwrap().get_record(key).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_cancels_pending_sync() {
        let f = fixture();
        let entry = f.catalog.create_knowledge("Horários", "Aberto").unwrap();
        let key = RecordKey::new(RecordKind::Knowledge, entry.id);
        assert!(f.scheduler.is_pending(key));

        f.catalog.delete(key).await.unwrap();
        assert!(!f.scheduler.is_pending(key));
        // Never synced, so there was no point to delete
        assert!(f.index.deletes().is_empty());

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_during_running_sync_leaves_no_point() {
        let f = fixture_with_delay(5);
        f.embedder.set_delay_secs(10);
        let entry = f.catalog.create_knowledge("Horários", "Aberto").unwrap();
        let key = RecordKey::new(RecordKind::Knowledge, entry.id);

        // Timer fired at 5s; the embedding call is still in flight
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(!f.scheduler.is_pending(key));
        assert_eq!(f.embedder.calls(), 1);

        let deleted = f.catalog.delete(key).await.unwrap();

        let point_id = deleted.external_index_id().unwrap();
        assert_eq!(f.index.upserts(), 1);
        assert_eq!(f.index.deletes(), vec![vec![point_id]]);
        assert_eq!(f.index.inner.len("chatbot_memory"), 0);
        assert!(lock(f.catalog.store()).unwrap().get_record(key).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_embedder_availability() {
        let f = fixture();
        let services = Services::new(
            shared(SqliteStorage::open_memory().unwrap()),
            Arc::new(BoxedProvider::new(f.embedder.clone())),
            RecordingIndex::new(),
            None,
            "chatbot_memory",
            DIMS,
            Duration::from_secs(300),
        );
        assert!(services.embedder_available().await);
        assert_eq!(services.embedder_info().model, "fake-embed");
        assert_eq!(services.embedder_info().dimensions, DIMS);
    }

    #[test]
    fn test_chat_requires_generator() {
        let store = shared(SqliteStorage::open_memory().unwrap());
        let services = Services::new(
            store,
            Arc::new(BoxedProvider::new(FakeEmbedder::new(DIMS))),
            RecordingIndex::new(),
            None,
            "chatbot_memory",
            DIMS,
            Duration::from_secs(300),
        );
        assert!(matches!(services.chat(), Err(Error::Config(_))));
    }
}
