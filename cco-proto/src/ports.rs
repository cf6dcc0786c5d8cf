//! Port traits: the boundary every concrete store/provider/registry
//! implementation satisfies, and every engine crate (`cco-pipeline`,
//! `cco-plan`, `cco-orchestrator`, ...) programs against (§4.A-E, §6.2).

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::{
    EventLogError, HookError as HookErr, PlaybookRegistryError, ProviderError, TaskStoreError,
    TimelineStoreError,
};
use crate::event::{Event, EventType};
use crate::hook::HookRun;
use crate::id::{
    EventId, IntentCardId, IntentLogId, IntentSignalId, MessageId, ProfileId, TaskId, ThreadId,
    TimelineItemId, WorkspaceId,
};
use crate::identity::{ExecutionContext, IntentDefinition, ResolvedIntent};
use crate::intent::{IntentCard, IntentLog, IntentSignal};
use crate::playbook::{Playbook, PlaybookMetadata, PlaybookRun, PlaybookSource};
use crate::provider::{ChatCompletion, ChatDelta, ChatMessage, ProviderType};
use crate::task::{Task, TaskStatus};
use crate::timeline::{Cta, TimelineItem};

/// §4.A Event Log: append-only, causally ordered per workspace.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Durably append one event. A failed append is fatal to the caller
    /// (§4.A) — there is no silent-drop path.
    async fn append(&self, event: Event) -> Result<EventId, EventLogError>;

    /// List events in chronological order, optionally filtered.
    #[allow(clippy::too_many_arguments)]
    async fn list(
        &self,
        workspace_id: &WorkspaceId,
        thread_id: Option<&ThreadId>,
        types: Option<&[EventType]>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        limit: Option<usize>,
        before_id: Option<&EventId>,
    ) -> Result<Vec<Event>, EventLogError>;

    /// Number of messages recorded on one thread, used by the default
    /// thread-title summariser trigger (§3 Thread lifecycle).
    async fn count_messages_by_thread(
        &self,
        workspace_id: &WorkspaceId,
        thread_id: &ThreadId,
    ) -> Result<u64, EventLogError>;
}

/// §4.B Task Store: lifecycle records for units of work.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Register a newly created task, always in `Pending` status.
    async fn create(&self, task: Task) -> Result<(), TaskStoreError>;

    /// Apply a status transition. Implementations must reject any transition
    /// out of a terminal status (§3 Task invariant, §8 property).
    async fn update_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), TaskStoreError>;

    /// Fetch one task by id.
    async fn get(&self, task_id: &TaskId) -> Result<Task, TaskStoreError>;

    /// Fetch every task sharing an execution correlator.
    async fn get_by_execution_id(
        &self,
        execution_id: &crate::id::ExecutionId,
    ) -> Result<Vec<Task>, TaskStoreError>;

    /// All tasks still `Pending` in a workspace.
    async fn list_pending(&self, workspace_id: &WorkspaceId) -> Result<Vec<Task>, TaskStoreError>;

    /// All tasks currently `Running` in a workspace.
    async fn list_running(&self, workspace_id: &WorkspaceId) -> Result<Vec<Task>, TaskStoreError>;
}

/// §4.C Timeline Store: derived UI result cards.
#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Create a new timeline item.
    async fn create(&self, item: TimelineItem) -> Result<(), TimelineStoreError>;

    /// List items for a workspace, most recent first.
    async fn list_by_workspace(
        &self,
        workspace_id: &WorkspaceId,
        limit: Option<usize>,
    ) -> Result<Vec<TimelineItem>, TimelineStoreError>;

    /// List every item produced by a single turn.
    async fn list_by_message(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<TimelineItem>, TimelineStoreError>;

    /// Patch an item's `data`/`cta` fields in place.
    async fn update(
        &self,
        item_id: &TimelineItemId,
        data: Option<serde_json::Value>,
        cta: Option<Vec<Cta>>,
    ) -> Result<(), TimelineStoreError>;
}

/// §4.D Playbook Registry: content-addressable catalogue over three sources.
#[async_trait]
pub trait PlaybookRegistry: Send + Sync {
    /// List metadata for every playbook visible to a workspace, optionally
    /// filtered to a single discovery source.
    async fn list(
        &self,
        workspace_id: &WorkspaceId,
        locale: &str,
        source: Option<PlaybookSource>,
    ) -> Result<Vec<PlaybookMetadata>, PlaybookRegistryError>;

    /// Resolve one playbook's full manifest by code.
    async fn get(
        &self,
        playbook_code: &str,
        locale: &str,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<Playbook>, PlaybookRegistryError>;

    /// Resolve a playbook plus whatever structured workflow it carries.
    async fn load_run(
        &self,
        playbook_code: &str,
        locale: &str,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<PlaybookRun>, PlaybookRegistryError>;

    /// Register or replace one playbook from a given source. Per §9's
    /// resolution of the registry's Open Question, a later call for the same
    /// `playbook_code` fully replaces the earlier definition regardless of
    /// source, as long as callers register in source-priority order
    /// (built-in, then capability-pack, then user-defined).
    async fn register(
        &self,
        playbook: Playbook,
        source: PlaybookSource,
    ) -> Result<(), PlaybookRegistryError>;
}

/// Durable storage for IntentCards, IntentSignals, and the IntentLog audit
/// trail (§3 IntentCard/IntentSignal/IntentLog, consumed by `cco-pipeline`
/// and `cco-steward`). Grouped under one trait since every implementation
/// backs all three with the same storage engine.
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Persist a newly created or updated IntentCard.
    async fn put_card(&self, card: IntentCard) -> Result<(), crate::error::CoreError>;

    /// Fetch one card by id.
    async fn get_card(
        &self,
        id: &IntentCardId,
    ) -> Result<Option<IntentCard>, crate::error::CoreError>;

    /// Cards visible to IntentSteward input collection: `active` status and
    /// `priority in {high, medium}`, most recently touched first, capped at
    /// `limit` (§4.L step 1).
    async fn list_visible_cards(
        &self,
        profile_id: &ProfileId,
        limit: usize,
    ) -> Result<Vec<IntentCard>, crate::error::CoreError>;

    /// Persist a transient signal.
    async fn put_signal(&self, signal: IntentSignal) -> Result<(), crate::error::CoreError>;

    /// Candidate signals from the last `window` before now, for one workspace.
    async fn recent_candidate_signals(
        &self,
        workspace_id: &WorkspaceId,
        window: chrono::Duration,
    ) -> Result<Vec<IntentSignal>, crate::error::CoreError>;

    /// Mark a signal's triage status (e.g. `accepted` once folded into a card).
    async fn update_signal_status(
        &self,
        id: &IntentSignalId,
        status: crate::intent::IntentSignalStatus,
    ) -> Result<(), crate::error::CoreError>;

    /// Append one audit log entry. Never mutated once written (§3 IntentLog).
    async fn append_log(&self, log: IntentLog) -> Result<IntentLogId, crate::error::CoreError>;
}

/// The HookRun idempotency ledger (§3 HookRun, §4.J step 3).
#[async_trait]
pub trait HookRunLedger: Send + Sync {
    /// Insert a row under a uniqueness constraint on `idempotency_key`.
    /// Returns `Ok(None)` on a fresh insert, or `Ok(Some(existing))` if the
    /// key was already present — the caller must short-circuit on `Some`
    /// rather than re-execute the hook body (§8 idempotence law).
    async fn insert_if_absent(&self, run: HookRun) -> Result<Option<HookRun>, HookErr>;

    /// Fetch an existing row by key, without inserting.
    async fn get(&self, idempotency_key: &str) -> Result<Option<HookRun>, HookErr>;
}

/// §4.E Provider Adapter: the uniform capability surface over every vendor.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which wire format this adapter speaks, used by the Streaming Executor
    /// to pick a token-framing path.
    fn provider_type(&self) -> ProviderType;

    /// Synchronous completion.
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<ChatCompletion, ProviderError>;

    /// Streaming completion: a finite, non-restartable sequence of text
    /// deltas. Dropping the returned stream stops further reads promptly
    /// (§4.E cancellation contract). Adapters that cannot stream natively
    /// return [`ProviderError::SamplingNotSupported`] so the Streaming
    /// Executor can fall back to chunking a synchronous call (§4.I).
    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatDelta, ProviderError>> + Send>>, ProviderError>;
}

/// §6.2 IdentityPort: pluggable adapter resolving the execution identity a
/// turn runs under.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    /// Resolve (or synthesise) the execution context for a turn.
    async fn get_current_context(
        &self,
        workspace_id: Option<&WorkspaceId>,
        profile_id: Option<&ProfileId>,
    ) -> ExecutionContext;
}

/// §6.2 IntentRegistryPort: pluggable adapter resolving free text into
/// intents/themes ahead of the Intent Pipeline proper.
#[async_trait]
pub trait IntentRegistryPort: Send + Sync {
    /// Resolve one user input into intents/themes (§4.H step 6).
    async fn resolve_intent(
        &self,
        user_input: &str,
        ctx: &ExecutionContext,
        context: Option<&serde_json::Value>,
        locale: Option<&str>,
    ) -> ResolvedIntent;

    /// The catalogue this registry can resolve against, used by Layer 2's
    /// few-shot prompt construction (§4.F).
    async fn list_available_intents(&self, ctx: &ExecutionContext) -> Vec<IntentDefinition>;
}
