//! Catalog observer that drives the sync pipeline.

use super::scheduler::DebounceScheduler;
use crate::catalog::{RecordChange, RecordObserver};
use crate::model::{describe_fields, ChangedFields, RecordKey, SyncableRecord};
use crate::vector::VectorIndex;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a save with these changed fields needs a sync.
///
/// A known, non-empty set made only of bookkeeping fields is the pipeline
/// writing back its own results and must not schedule another run.
#[must_use]
pub fn should_schedule(changed_fields: Option<&ChangedFields>) -> bool {
    match changed_fields {
        Some(fields) if !fields.is_empty() => !fields.iter().all(|f| f.is_bookkeeping()),
        _ => true,
    }
}

/// Schedules debounced syncs on save and removes index points on delete.
pub struct ChangeNotifier {
    scheduler: DebounceScheduler,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new(scheduler: DebounceScheduler, index: Arc<dyn VectorIndex>, collection: &str) -> Self {
        Self {
            scheduler,
            index,
            collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl RecordObserver for ChangeNotifier {
    fn on_saved(&self, change: &RecordChange) {
        if !should_schedule(change.changed_fields.as_ref()) {
            debug!(
                record = %change.record.key(),
                fields = %change.changed_fields.as_ref().map(describe_fields).unwrap_or_default(),
                "Bookkeeping-only save, not scheduling sync"
            );
            return;
        }
        self.scheduler.schedule(change.record.clone());
    }

    async fn before_delete(&self, key: RecordKey) {
        self.scheduler.cancel(key);
        self.scheduler.wait_idle(key).await;
    }

    async fn on_deleted(&self, record: &SyncableRecord) {
        let key = record.key();
        self.scheduler.cancel(key);

        let Some(point_id) = record.external_index_id() else {
            return;
        };
        match self.index.delete(&self.collection, &[point_id]).await {
            Ok(()) => info!(record = %key, %point_id, "Removed index point"),
            Err(e) => warn!(
                record = %key,
                %point_id,
                error = %e,
                "Failed to remove index point; the point may linger"
            ),
        }
    }
}
