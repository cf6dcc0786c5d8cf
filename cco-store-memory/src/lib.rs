#![deny(missing_docs)]
//! In-memory implementations of every `cco-proto` store port.
//!
//! Each store is a `HashMap` (or `Vec`, for the append-only Event Log)
//! behind a `tokio::sync::RwLock`, in the style of `neuron-state-memory`'s
//! `MemoryStore`. Suitable for testing, prototyping, and single-process
//! deployments; nothing here survives a restart.

mod event_log;
mod hook_ledger;
mod intent_store;
mod task_store;
mod timeline_store;

pub use event_log::MemoryEventLog;
pub use hook_ledger::MemoryHookRunLedger;
pub use intent_store::MemoryIntentStore;
pub use task_store::MemoryTaskStore;
pub use timeline_store::MemoryTimelineStore;
