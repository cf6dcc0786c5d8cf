#![deny(missing_docs)]
//! # cco — Conversation Orchestration Core, umbrella crate
//!
//! Provides a single import surface over the orchestration stack: the
//! Conversation Orchestrator and Streaming Executor (`cco-orchestrator`),
//! the Intent Pipeline (`cco-pipeline`), the Plan Builder (`cco-plan`),
//! IntentSteward (`cco-steward`), the Event-Hook Runner and Sampling Gate
//! (`cco-hooks`), the Playbook Registry (`cco-playbook`), and the in-memory
//! Store backends (`cco-store-memory`) good enough for development and
//! single-process deployments. Re-exports each behind a feature flag, plus
//! a `prelude` for the happy path.

#[cfg(feature = "core")]
pub use cco_orchestrator;
#[cfg(feature = "core")]
pub use cco_pipeline;
#[cfg(feature = "core")]
pub use cco_plan;
#[cfg(feature = "core")]
pub use cco_proto;
#[cfg(feature = "core")]
pub use cco_steward;
#[cfg(feature = "hooks")]
pub use cco_hooks;
#[cfg(feature = "playbook")]
pub use cco_playbook;
#[cfg(feature = "provider")]
pub use cco_provider;
#[cfg(feature = "store-memory")]
pub use cco_store_memory;

/// Happy-path imports for wiring a Conversation Orchestrator over the
/// in-memory Store backends.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use cco_orchestrator::{
        BackgroundDispatch, BackgroundRunner, ConversationOrchestrator, LocalIdentityPort,
        LexiconIntentRegistryPort, RouteInput, RouteMode, RouteOutcome, StreamEvent,
        StreamingExecutor,
    };

    #[cfg(feature = "core")]
    pub use cco_proto::{
        ChatMessage, ConfigSnapshot, CoreError, EventLog, IdentityPort, IntentRegistryPort,
        IntentStore, Playbook, PlaybookRegistry, Provider, Task, TaskStatus, TaskStore,
        TimelineStore,
    };

    #[cfg(feature = "hooks")]
    pub use cco_hooks::{ChatSyncedInput, HookRunner, SamplingGate};

    #[cfg(feature = "playbook")]
    pub use cco_playbook::MemoryPlaybookRegistry;

    #[cfg(feature = "store-memory")]
    pub use cco_store_memory::{
        MemoryEventLog, MemoryHookRunLedger, MemoryIntentStore, MemoryTaskStore,
        MemoryTimelineStore,
    };
}
