//! The Streaming Executor's closed SSE event taxonomy (§4.I) and the sink
//! seam [`ConversationOrchestrator`](crate::orchestrator::ConversationOrchestrator)
//! emits through while it runs a turn.

use cco_proto::{
    EventId, ExecutionId, ExecutionPlan, MessageId, RunId, Task, TaskPlan, TimelineItem,
    WorkspaceId,
};

/// One `pipeline_stage` boundary name (§4.I row 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStageKind {
    /// Pre-pipeline and Intent Pipeline extraction ran.
    IntentExtraction,
    /// Context assembly for the QA/streaming path began.
    ContextBuilding,
    /// A playbook was selected (or deliberately not selected).
    PlaybookSelection,
    /// Task/playbook dispatch began.
    ExecutionStart,
    /// A task was handed to its executor.
    TaskAssignment,
    /// No playbook could be resolved for this turn.
    NoPlaybookFound,
    /// The pipeline determined nothing needed to happen this turn.
    NoActionNeeded,
    /// A stage failed in a way that is surfaced but non-fatal to the turn.
    ExecutionError,
}

impl PipelineStageKind {
    /// The wire tag for this stage, carried in `pipeline_stage.stage`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IntentExtraction => "intent_extraction",
            Self::ContextBuilding => "context_building",
            Self::PlaybookSelection => "playbook_selection",
            Self::ExecutionStart => "execution_start",
            Self::TaskAssignment => "task_assignment",
            Self::NoPlaybookFound => "no_playbook_found",
            Self::NoActionNeeded => "no_action_needed",
            Self::ExecutionError => "execution_error",
        }
    }
}

/// The kind of status change a `task_update` event reports (§4.I row 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskUpdateKind {
    /// The task row was just created.
    Created,
    /// The task started running.
    Started,
    /// The task reached a successful terminal state.
    Succeeded,
    /// The task reached a failed terminal state.
    Failed,
    /// The task was cancelled before it started.
    Skipped,
}

impl TaskUpdateKind {
    /// The wire tag for this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One SSE envelope value (§4.I). Ordering across a single turn's stream is
/// constrained by the strict contract described there: exactly one
/// `Connected`, then `UserMessage`, then zero-or-more `PipelineStage`, at
/// most one `ExecutionPlan`, freely interleaved `TaskUpdate`/`Chunk`, an
/// optional `ExecutionResults`, at most one of the four "mode" events, and
/// exactly one of `Complete`/`Error` as the final event.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The stream opened for this workspace.
    Connected {
        /// The workspace this stream belongs to.
        workspace_id: WorkspaceId,
    },
    /// The USER turn was durably recorded.
    UserMessage {
        /// The appended Event Log row's id.
        event_id: EventId,
    },
    /// A named stage boundary within the turn.
    PipelineStage {
        /// Correlates every stage boundary within one turn's stream.
        run_id: RunId,
        /// Which stage this boundary reports.
        stage: PipelineStageKind,
        /// Human-readable progress note.
        message: String,
        /// Opaque stage-specific detail.
        metadata: Option<serde_json::Value>,
    },
    /// The finalised plan for this turn.
    ExecutionPlan {
        /// The plan itself.
        plan: ExecutionPlan,
    },
    /// A task's status changed.
    TaskUpdate {
        /// What kind of change this is.
        event_type: TaskUpdateKind,
        /// The task after the change.
        task: Task,
    },
    /// Final dispatch summary for the turn's plan.
    ExecutionResults {
        /// Tasks that ran to completion (or were dispatched) this turn.
        executed_tasks: Vec<Task>,
        /// Timeline cards surfaced for confirmation or review.
        suggestion_cards: Vec<TimelineItem>,
    },
    /// The non-streamed portion of the reply is done; chunks may still
    /// follow for the provider-backed remainder.
    QuickResponseComplete {
        /// The turn this completion belongs to.
        message_id: MessageId,
    },
    /// One text delta of the assistant's streamed reply.
    Chunk {
        /// Incremental text content.
        content: String,
        /// The assistant message this delta belongs to, once known.
        message_id: Option<MessageId>,
        /// Set on the terminal delta.
        is_final: Option<bool>,
    },
    /// A two-part agent-mode reply was parsed out of the model's output.
    AgentModeParsed {
        /// The conversational half of the reply.
        part1: String,
        /// The structured half of the reply.
        part2: String,
        /// Tasks extracted from the structured half.
        executable_tasks: Vec<TaskPlan>,
    },
    /// A JSON-workflow playbook ran under agent mode.
    AgentModePlaybookExecuted {
        /// The playbook that ran.
        playbook_code: String,
        /// Correlator shared by every task this dispatch spawned.
        execution_id: ExecutionId,
        /// Tasks spawned by this dispatch.
        tasks: Vec<Task>,
    },
    /// A JSON-workflow playbook ran under the non-agent execution mode.
    ExecutionModePlaybookExecuted {
        /// The playbook that ran.
        playbook_code: String,
        /// Correlator shared by every task this dispatch spawned.
        execution_id: ExecutionId,
        /// Tasks spawned by this dispatch.
        tasks: Vec<Task>,
    },
    /// A playbook's trigger was recorded independent of how it executes.
    PlaybookTriggered {
        /// The playbook that was triggered.
        playbook_code: String,
        /// Correlator for this dispatch.
        execution_id: ExecutionId,
    },
    /// Terminal event: the turn finished successfully.
    Complete {
        /// The originating USER event's id.
        event_id: EventId,
        /// Final context token estimate, after any truncation.
        context_tokens: u32,
        /// Always `true`; carried for wire-shape parity with `error`.
        is_final: bool,
    },
    /// Terminal event: the turn failed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
    /// A keep-alive comment line, sent every 30s on an externally-facing
    /// stream with no payload of its own.
    Heartbeat,
}

/// Where [`ConversationOrchestrator`](crate::orchestrator::ConversationOrchestrator)
/// sends the events it produces while running a turn. A plain synchronous
/// trait rather than `async_trait`: every implementation only needs to push
/// onto a channel, never to await anything of its own.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn emit(&self, event: StreamEvent);
}

/// A sink that forwards every event onto an unbounded channel, the
/// collaborator the Streaming Executor hands [`ConversationOrchestrator`](crate::orchestrator::ConversationOrchestrator)
/// so a turn's internal stages become the outer SSE stream (§9 "this
/// implementation uses an `mpsc` channel wrapped as a `Stream`").
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    /// Wrap a sender end as an [`EventSink`].
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: StreamEvent) {
        // The receiver only disappears once the outer stream is dropped, at
        // which point nobody is listening for the rest of the turn anyway.
        let _ = self.tx.send(event);
    }
}

/// A sink that discards everything, for callers that only want
/// [`ConversationOrchestrator::route`](crate::orchestrator::ConversationOrchestrator::route)'s
/// return value and have no use for the in-flight stage events.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: StreamEvent) {}
}
