//! Debounced sync scheduling.
//!
//! One pending timer per record key. Scheduling a key that already has a
//! timer aborts it and starts over with the newer snapshot, so a burst of
//! edits costs a single sync run with the last state.
//!
//! A timer removes its own registry entry before it starts the sync. From
//! then on the sync is no longer pending but running: a later schedule
//! starts a fresh timer instead of aborting it, and [`DebounceScheduler::wait_idle`]
//! lets a delete wait for it to finish before cleaning up the index.

use crate::model::{RecordKey, SyncableRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Work run when a timer fires.
#[async_trait]
pub trait SyncRunner: Send + Sync {
    /// Sync one record. Failures are the runner's to log.
    async fn run(&self, record: SyncableRecord);
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
    record: SyncableRecord,
}

/// A fired sync. The receiver closes when the run's sender is dropped.
struct Running {
    generation: u64,
    done: watch::Receiver<()>,
}

#[derive(Default)]
struct Registry {
    next_generation: u64,
    pending: HashMap<RecordKey, Pending>,
    running: HashMap<RecordKey, Vec<Running>>,
}

impl Registry {
    /// Move the entry for `key` from pending to running if it still belongs
    /// to `generation`.
    fn start(
        &mut self,
        key: RecordKey,
        generation: u64,
    ) -> Option<(SyncableRecord, watch::Sender<()>)> {
        match self.pending.get(&key) {
            Some(p) if p.generation == generation => {}
            _ => return None,
        }
        let pending = self.pending.remove(&key)?;
        let (sender, done) = watch::channel(());
        self.running
            .entry(key)
            .or_default()
            .push(Running { generation, done });
        Some((pending.record, sender))
    }

    fn finish(&mut self, key: RecordKey, generation: u64) {
        if let Some(runs) = self.running.get_mut(&key) {
            runs.retain(|run| run.generation != generation);
            if runs.is_empty() {
                self.running.remove(&key);
            }
        }
    }
}

/// Process-wide registry of pending syncs.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct DebounceScheduler {
    runtime: Handle,
    runner: Arc<dyn SyncRunner>,
    delay: Duration,
    registry: Arc<Mutex<Registry>>,
}

impl DebounceScheduler {
    /// Create a scheduler whose timers run on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle, runner: Arc<dyn SyncRunner>, delay: Duration) -> Self {
        Self {
            runtime,
            runner,
            delay,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    // Runners never execute under this lock, so the map survives poisoning.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule a sync of `record` after the configured delay.
    pub fn schedule(&self, record: SyncableRecord) {
        self.schedule_in(record, self.delay);
    }

    /// Schedule a sync of `record` after `delay`, replacing any pending one
    /// for the same key. Never blocks on the sync itself.
    pub fn schedule_in(&self, record: SyncableRecord, delay: Duration) {
        let key = record.key();
        let mut registry = self.registry();
        registry.next_generation += 1;
        let generation = registry.next_generation;

        let shared = Arc::clone(&self.registry);
        let runner = Arc::clone(&self.runner);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let started = shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .start(key, generation);
            if let Some((record, _done)) = started {
                runner.run(record).await;
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .finish(key, generation);
            }
        });

        let pending = Pending {
            generation,
            handle,
            record,
        };
        if let Some(previous) = registry.pending.insert(key, pending) {
            previous.handle.abort();
            debug!(record = %key, "Superseded pending sync");
        }
        debug!(record = %key, delay_secs = delay.as_secs(), "Scheduled sync");
    }

    /// Cancel the pending sync for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: RecordKey) -> bool {
        match self.registry().pending.remove(&key) {
            Some(pending) => {
                pending.handle.abort();
                debug!(record = %key, "Cancelled pending sync");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_pending(&self, key: RecordKey) -> bool {
        self.registry().pending.contains_key(&key)
    }

    /// Number of pending syncs.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.registry().pending.len()
    }

    /// Keys with a pending sync, sorted.
    #[must_use]
    pub fn pending_keys(&self) -> Vec<RecordKey> {
        let mut keys: Vec<_> = self.registry().pending.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Wait until no fired sync for `key` is still running.
    ///
    /// Pending timers are not waited for; cancel them first.
    pub async fn wait_idle(&self, key: RecordKey) {
        let running: Vec<watch::Receiver<()>> = self
            .registry()
            .running
            .get(&key)
            .map(|runs| runs.iter().map(|run| run.done.clone()).collect())
            .unwrap_or_default();
        for mut done in running {
            // Nothing is ever sent; the run is over once the sender drops
            while done.changed().await.is_ok() {}
        }
    }

    /// Run every pending sync now, one after another, in key order.
    /// Returns how many ran.
    pub async fn flush(&self) -> usize {
        let mut records = self.drain();
        records.sort_by_key(SyncableRecord::key);
        let count = records.len();
        for record in records {
            self.runner.run(record).await;
        }
        count
    }

    /// Drop every pending sync without running it. Returns how many were
    /// dropped.
    pub fn cancel_all(&self) -> usize {
        let dropped = self.drain().len();
        if dropped > 0 {
            debug!(dropped, "Discarded pending syncs");
        }
        dropped
    }

    fn drain(&self) -> Vec<SyncableRecord> {
        self.registry()
            .pending
            .drain()
            .map(|(_, pending)| {
                pending.handle.abort();
                pending.record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KnowledgeEntry;

    #[derive(Default)]
    struct Recorder {
        runs: Mutex<Vec<SyncableRecord>>,
    }

    impl Recorder {
        fn contents(&self) -> Vec<String> {
            self.runs
                .lock()
                .unwrap()
                .iter()
                .map(|r| match r {
                    SyncableRecord::Knowledge(k) => k.content.clone(),
                    other => other.display_name().to_string(),
                })
                .collect()
        }
    }

    #[async_trait]
    impl SyncRunner for Recorder {
        async fn run(&self, record: SyncableRecord) {
            self.runs.lock().unwrap().push(record);
        }
    }

    fn entry(id: i64, content: &str) -> SyncableRecord {
        SyncableRecord::Knowledge(KnowledgeEntry {
            id,
            title: "Horários".to_string(),
            content: content.to_string(),
            external_index_id: None,
            created_at: 0,
            updated_at: 0,
        })
    }

    fn scheduler(delay_secs: u64) -> (DebounceScheduler, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(
            Handle::current(),
            recorder.clone(),
            Duration::from_secs(delay_secs),
        );
        (scheduler, recorder)
    }

    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once_with_last_snapshot() {
        let (scheduler, recorder) = scheduler(300);
        for version in 1..=5 {
            scheduler.schedule(entry(1, &format!("v{version}")));
        }
        assert_eq!(scheduler.pending(), 1);

        advance(299).await;
        assert!(recorder.contents().is_empty());

        advance(2).await;
        assert_eq!(recorder.contents(), vec!["v5".to_string()]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_within_window_supersedes() {
        let (scheduler, recorder) = scheduler(5);
        scheduler.schedule(entry(1, "first"));
        advance(3).await;
        scheduler.schedule(entry(1, "second"));

        // The first timer would have fired at t=5
        advance(3).await;
        assert!(recorder.contents().is_empty());

        advance(3).await;
        assert_eq!(recorder.contents(), vec!["second".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let (scheduler, recorder) = scheduler(5);
        scheduler.schedule(entry(2, "b"));
        scheduler.schedule(entry(1, "a"));
        assert_eq!(
            scheduler.pending_keys(),
            vec![entry(1, "a").key(), entry(2, "b").key()]
        );

        advance(6).await;
        let mut contents = recorder.contents();
        contents.sort();
        assert_eq!(contents, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let (scheduler, recorder) = scheduler(5);
        let record = entry(1, "a");
        let key = record.key();
        scheduler.schedule(record);

        assert!(scheduler.is_pending(key));
        assert!(scheduler.cancel(key));
        assert!(!scheduler.cancel(key));

        advance(10).await;
        assert!(recorder.contents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_runs_pending_now() {
        let (scheduler, recorder) = scheduler(300);
        scheduler.schedule(entry(2, "b"));
        scheduler.schedule(entry(1, "a"));

        assert_eq!(scheduler.flush().await, 2);
        assert_eq!(recorder.contents(), vec!["a".to_string(), "b".to_string()]);

        // Aborted timers never fire afterwards
        advance(400).await;
        assert_eq!(recorder.contents().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_discards() {
        let (scheduler, recorder) = scheduler(5);
        scheduler.schedule(entry(1, "a"));
        scheduler.schedule(entry(2, "b"));

        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.pending(), 0);
        advance(10).await;
        assert!(recorder.contents().is_empty());
    }

    /// Runner that takes `secs` of (paused) time per sync.
    struct SlowRunner {
        secs: u64,
        finished: Mutex<usize>,
    }

    #[async_trait]
    impl SyncRunner for SlowRunner {
        async fn run(&self, _record: SyncableRecord) {
            tokio::time::sleep(Duration::from_secs(self.secs)).await;
            *self.finished.lock().unwrap() += 1;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_waits_for_running_sync() {
        let runner = Arc::new(SlowRunner {
            secs: 10,
            finished: Mutex::new(0),
        });
        let scheduler =
            DebounceScheduler::new(Handle::current(), runner.clone(), Duration::from_secs(5));
        let record = entry(1, "a");
        let key = record.key();
        scheduler.schedule(record);

        advance(7).await;
        assert!(!scheduler.is_pending(key));
        assert_eq!(*runner.finished.lock().unwrap(), 0);

        scheduler.wait_idle(key).await;
        assert_eq!(*runner.finished.lock().unwrap(), 1);

        // Nothing running: returns at once
        scheduler.wait_idle(key).await;
        scheduler.wait_idle(entry(2, "b").key()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_timer_leaves_registry() {
        let (scheduler, recorder) = scheduler(5);
        scheduler.schedule(entry(1, "a"));
        advance(6).await;
        assert_eq!(scheduler.pending(), 0);

        scheduler.schedule(entry(1, "b"));
        advance(6).await;
        assert_eq!(recorder.contents(), vec!["a".to_string(), "b".to_string()]);
    }
}
