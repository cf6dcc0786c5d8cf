//! The append-only Event Log record (§3 Event, §4.A).

use crate::id::{EventId, MessageId, ProfileId, ProjectId, ThreadId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Who produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The human on the other end of the turn.
    User,
    /// The model's reply.
    Assistant,
    /// The core itself (errors, background-runner bookkeeping).
    System,
}

/// The closed `event_type` enum, with a catch-all for forward compatibility.
///
/// Variants map 1:1 onto the event names used throughout §4 and §6.3.
/// `Other` carries any `event_type` string this build does not yet know
/// about, so a newer writer and an older reader can coexist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventType {
    /// A USER or ASSISTANT chat message.
    Message,
    /// A new long-term intent signal was created.
    IntentCreated,
    /// A pipeline_stage boundary (see §4.I).
    PipelineStage,
    /// An ExecutionPlan was finalised.
    ExecutionPlan,
    /// A task changed status.
    TaskUpdate,
    /// A dispatched agent/task execution completed.
    AgentExecution,
    /// A task produced a durable artifact.
    ArtifactCreated,
    /// A decision requires human input before proceeding.
    DecisionRequired,
    /// A run's overall state changed (e.g. background turn finished).
    RunStateChanged,
    /// A caller-supplied receipt was validated and the hook was skipped.
    ReceiptAccepted,
    /// A caller-supplied receipt failed validation and the hook ran anyway.
    ReceiptRejected,
    /// Anything the writer understands but this reader build does not.
    Other {
        /// The original `event_type` string.
        kind: String,
    },
}

/// A single append-only record in the Event Log (§3 Event).
///
/// Invariant: events are never mutated after [`crate::event_log::EventLog::append`]
/// returns; corrections are always new events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Opaque, globally unique identifier assigned by the caller.
    pub id: EventId,
    /// Monotonic per workspace; wall-clock for display purposes only.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Who produced this event.
    pub actor: Actor,
    /// The closed event-type tag plus any type-specific fields folded in.
    pub event_type: EventType,
    /// The workspace this event belongs to.
    pub workspace_id: WorkspaceId,
    /// The thread this event belongs to, if any.
    pub thread_id: Option<ThreadId>,
    /// The project this event is associated with, if any.
    pub project_id: Option<ProjectId>,
    /// The profile that caused this event, when attributable.
    pub profile_id: Option<ProfileId>,
    /// The originating message, when this event is turn-scoped.
    pub message_id: Option<MessageId>,
    /// Opaque, forward-compatible payload.
    pub payload: serde_json::Value,
    /// References to intent cards, tasks, etc. this event concerns.
    pub entity_ids: Vec<String>,
    /// Free-form metadata (e.g. `{is_error: true}`, intents/themes annotations).
    pub metadata: serde_json::Value,
}

impl Event {
    /// Build an event with empty payload/metadata and no entity references,
    /// the common case for stage-boundary bookkeeping events.
    pub fn new(
        id: EventId,
        timestamp: chrono::DateTime<chrono::Utc>,
        actor: Actor,
        event_type: EventType,
        workspace_id: WorkspaceId,
    ) -> Self {
        Self {
            id,
            timestamp,
            actor,
            event_type,
            workspace_id,
            thread_id: None,
            project_id: None,
            profile_id: None,
            message_id: None,
            payload: serde_json::Value::Null,
            entity_ids: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// A conversation slice within a workspace (§3 Thread).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Identifier, unique within the workspace.
    pub id: ThreadId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// Display title; may be refined by a background summariser.
    pub title: String,
    /// Exactly one thread per workspace has this set.
    pub is_default: bool,
    /// Timestamp of the most recent message, if any.
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Running message count, maintained by the writer.
    pub message_count: u64,
}
