//! Knowledge-base sync pipeline.
//!
//! Keeps the vector index in step with the catalog:
//!
//! - **Extract**: record → plain text and a source label
//! - **Schedule**: coalesce bursts of saves per record into one deferred run
//! - **Notify**: catalog observer that schedules on save and deletes index
//!   points on delete
//! - **Orchestrate**: extract, assign the record's index id, embed, upsert,
//!   and flag documents processed
//!
//! # Architecture
//!
//! ```text
//! Catalog write ──▶ ChangeNotifier ──▶ DebounceScheduler ──(delay)──▶ SyncOrchestrator
//!                        │                                               │
//!                        └── delete ──▶ VectorIndex ◀── upsert ──────────┘
//! ```
//!
//! Failures stop at the orchestrator and notifier: they are logged and never
//! reach the write that triggered them.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = DebounceScheduler::new(handle, orchestrator.clone(), delay);
//! catalog.subscribe(Arc::new(ChangeNotifier::new(scheduler.clone(), index, "chatbot_memory")));
//!
//! catalog.update_knowledge(id, None, Some("Aberto das 8h às 18h"))?;
//! scheduler.flush().await;
//! ```

pub mod extract;
pub mod notifier;
pub mod orchestrator;
pub mod scheduler;

pub use extract::{extract, trail_text, truncate_chars, Extracted, MAX_EMBED_CHARS};
pub use notifier::{should_schedule, ChangeNotifier};
pub use orchestrator::{ForceSyncReport, SyncFailure, SyncOrchestrator, SyncOutcome, SYNC_ACTOR};
pub use scheduler::{DebounceScheduler, SyncRunner};
