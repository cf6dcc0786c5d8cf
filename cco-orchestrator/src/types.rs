//! `route()` input/output shapes (§4.H).

use cco_proto::{
    EventId, ExecutionId, Playbook, ProfileId, ProjectId, TimelineItem, WorkspaceId,
};

/// One file attached to the turn before normalisation resolves it to a
/// `file_document_id` (§4.H step 1).
#[derive(Debug, Clone)]
pub struct RouteInputFile {
    /// The id as submitted by the caller.
    pub id: String,
    /// MIME type as reported by the upload handler.
    pub mime_type: String,
}

/// A file id that step 1 resolved against recent events, or the id the
/// caller submitted when no matching event could be found (reported, not
/// fatal — §4.H step 1 "missing ids are reported but do not fail the turn").
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    /// The original input.
    pub input: RouteInputFile,
    /// The resolved event-scoped document id, when found.
    pub file_document_id: Option<String>,
}

/// Which execution surface a turn runs under. The two execution modes share
/// the same 12-step route; they differ only in how step 10's playbook
/// dispatch and its stream events are framed (§4.I agent-mode vs
/// execution-mode playbook-executed events).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Plain conversational/execution turn.
    Execution,
    /// Agent-mode turn: a two-part reply may be parsed out of the model's
    /// own output in addition to ordinary task dispatch.
    Agent,
}

/// Everything `route()` needs for one turn (§4.H).
#[derive(Debug, Clone)]
pub struct RouteInput {
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// The user's raw turn text.
    pub message: String,
    /// Files attached to this turn.
    pub files: Vec<RouteInputFile>,
    /// Which execution surface this turn runs under.
    pub mode: RouteMode,
    /// Project id supplied explicitly by the UI, if any (§4.H step 3).
    pub project_id: Option<ProjectId>,
    /// Thread this turn belongs to, if known; a default thread is used when
    /// absent.
    pub thread_id: Option<String>,
    /// Originating channel (`api`, `chat_app`, …), consulted by the Intent
    /// Pipeline's layer-1 channel rule.
    pub channel: String,
    /// Locale used for playbook lookups.
    pub locale: String,
    /// Whether the Plan Builder and Intent Pipeline may consult the LLM
    /// path at all, e.g. disabled under test or budget pressure.
    pub use_llm: bool,
    /// Workspace-scoped `auto_intent_layout` setting (§6.4), resolved by the
    /// caller against its own store rather than the process-wide
    /// [`cco_proto::ConfigSnapshot`], which deliberately does not carry it.
    pub auto_intent_layout: bool,
    /// Artifact names the workspace still expects, consulted by the Plan
    /// Builder's deterministic fallback planner.
    pub expected_artifacts: Vec<String>,
}

/// Result of resolving a playbook selection into a concrete dispatch plan
/// for step 10.
#[derive(Debug, Clone)]
pub struct PlaybookDispatch {
    /// The resolved playbook.
    pub playbook: Playbook,
    /// Correlator shared by every task this dispatch spawns.
    pub execution_id: ExecutionId,
}

/// `route()`'s return value (§4.H contract).
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// Echoes the input workspace.
    pub workspace_id: WorkspaceId,
    /// The USER event this turn appended in step 2, echoed back so the
    /// Streaming Executor's terminal `complete` event (§4.I) can reference
    /// it without re-deriving it.
    pub user_event_id: EventId,
    /// The suggestion/result cards produced by this turn, in creation order.
    pub display_events: Vec<TimelineItem>,
    /// The playbook this turn triggered, if any.
    pub triggered_playbook: Option<String>,
    /// Tasks dispatched but not yet settled when `route()` returned (e.g.
    /// asynchronously-dispatched JSON-workflow playbooks, §4.H step 10).
    pub pending_tasks: Vec<cco_proto::Task>,
    /// Final context token estimate for this turn's assembled prompt, after
    /// any §4.I truncation. `0` for turns that never built a QA/streaming
    /// context (e.g. the multi-step handoff early-return).
    pub context_tokens: u32,
}
