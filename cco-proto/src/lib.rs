#![deny(missing_docs)]
//! # cco-proto — protocol traits and domain types for the conversation orchestration core
//!
//! This crate defines the data model (§3) and the port traits (§4, §6.2) that
//! a Conversation Orchestration Core is built from: the Event Log, Task
//! Store, Timeline Store, Playbook Registry, Provider Adapter, Identity
//! Port, and Intent Registry Port. Every other `cco-*` crate either
//! implements one of these traits or consumes them as a dependency.
//!
//! Mirrors the shape of a `layer0`-style protocol crate: operation-defined
//! traits, typed opaque ids, `serde_json::Value` for forward-compatible
//! payloads, and closed `#[non_exhaustive]` error enums per boundary.

pub mod config;
pub mod error;
pub mod event;
pub mod hook;
pub mod id;
pub mod identity;
pub mod intent;
pub mod plan;
pub mod playbook;
pub mod ports;
pub mod provider;
pub mod task;
pub mod timeline;

pub use config::{ConfigSnapshot, ModelTokenBudget};
pub use error::{
    CoreError, EventLogError, HookError, OrchestratorError, PlaybookRegistryError, ProviderError,
    SamplingError, TaskStoreError, TimelineStoreError,
};
pub use event::{Actor, Event, EventType, Thread};
pub use hook::{
    HookResults, HookRun, HookRunStatus, Receipt, ReceiptDecision, ReceiptReason, SamplingResult,
    SamplingSource,
};
pub use id::{
    BackgroundJobId, EventId, ExecutionId, IntentCardId, IntentLogId, IntentSignalId, MessageId,
    PlanId, ProfileId, ProjectId, RunId, TaskId, ThreadId, TimelineItemId, WorkspaceId,
};
pub use identity::{ExecutionContext, IntentDefinition, PortContext, ResolvedIntent};
pub use intent::{
    IntentCard, IntentCardStatus, IntentLayoutPlan, IntentLog, IntentLogPhase, IntentOperation,
    IntentOperationType, IntentPriority, IntentSignal, IntentSignalSource, IntentSignalStatus,
    SignalMappingEntry,
};
pub use plan::{ExecutionPlan, PlanStep, ProjectAssignmentDecision};
pub use playbook::{
    InteractionMode, Playbook, PlaybookKind, PlaybookMetadata, PlaybookRun, PlaybookSource,
    WorkflowStep,
};
pub use ports::{
    EventLog, HookRunLedger, IdentityPort, IntentRegistryPort, IntentStore, PlaybookRegistry,
    Provider, TaskStore, TimelineStore,
};
pub use provider::{ChatCompletion, ChatDelta, ChatMessage, ChatRole, ProviderType, Usage};
pub use task::{SideEffectLevel, Task, TaskPlan, TaskStatus};
pub use timeline::{Cta, TimelineItem, TimelineItemType};
