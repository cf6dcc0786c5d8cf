#![deny(missing_docs)]
//! # cco-orchestrator — the Conversation Orchestrator and Streaming Executor
//!
//! Wires the Intent Pipeline (`cco-pipeline`), the Plan Builder (`cco-plan`),
//! and IntentSteward (`cco-steward`) into the top-level `route()` router
//! described in §4.H, plus the SSE-shaped Streaming Executor described in
//! §4.I that drives the same router incrementally. The Event-Hook Runner
//! (§4.J, `cco-hooks`) is a separate entrypoint triggered by an IDE's own
//! chat-sync flow, not a sub-step of `route()`.

pub mod background;
pub mod cancel;
pub mod context;
pub mod events;
pub mod identity;
pub mod intent_registry;
pub mod orchestrator;
pub mod project;
pub mod streaming;
pub mod types;

pub use background::{BackgroundDispatch, BackgroundRunner};
pub use cancel::{race, Cancelled, CancellationSignal, CancellationToken};
pub use context::{build_context, estimate_tokens, BuiltContext, ContextSection};
pub use events::{ChannelSink, EventSink, NullSink, PipelineStageKind, StreamEvent, TaskUpdateKind};
pub use identity::LocalIdentityPort;
pub use intent_registry::LexiconIntentRegistryPort;
pub use orchestrator::ConversationOrchestrator;
pub use project::assign_project;
pub use streaming::StreamingExecutor;
pub use types::{
    NormalizedFile, PlaybookDispatch, RouteInput, RouteInputFile, RouteMode, RouteOutcome,
};

#[cfg(test)]
pub(crate) mod test_support;
