//! IntentCard/IntentSignal/IntentLayoutPlan/IntentLog (§3, §4.F, §4.L).

use crate::id::{IntentCardId, IntentLogId, IntentSignalId, MessageId, ProfileId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a long-lived user goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCardStatus {
    /// Actively tracked.
    Active,
    /// Temporarily set aside by the user.
    Paused,
    /// Reached its goal.
    Completed,
    /// No longer tracked but retained for history.
    Archived,
}

/// Relative importance of an IntentCard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentPriority {
    /// Background goal.
    Low,
    /// Default priority.
    Medium,
    /// Actively worked towards.
    High,
    /// Treated as a must-do.
    Critical,
}

/// A long-lived user goal (§3 IntentCard).
///
/// Ownership: a profile exclusively owns its intent cards; workspaces
/// reference them only by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentCard {
    /// Identifier, unique process-wide.
    pub id: IntentCardId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Lifecycle state.
    pub status: IntentCardStatus,
    /// Relative importance.
    pub priority: IntentPriority,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Free-form category label.
    pub category: Option<String>,
    /// Completion estimate, `[0, 100]`.
    pub progress_percentage: u8,
    /// Provenance and rollback bookkeeping: `source`, originating turn id,
    /// workspace id, confidence, reasoning, and — after an UPDATE —
    /// `rollback_data` (§4.L step 4).
    pub metadata: serde_json::Value,
}

/// A transient observation produced by extractors and hooks (§3 IntentSignal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSignal {
    /// Identifier, unique process-wide.
    pub id: IntentSignalId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// Free text, trimmed, 3-200 chars (§3 invariant).
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Where this signal originated.
    pub source: IntentSignalSource,
    /// The turn that produced this signal, if any.
    pub message_id: Option<MessageId>,
    /// Triage state.
    pub status: IntentSignalStatus,
}

/// Where an [`IntentSignal`] originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSignalSource {
    /// Produced by the post-turn Event-Hook Runner.
    WsHook,
    /// Produced via MCP sampling through the Sampling Gate.
    McpSampling,
    /// Produced from an uploaded file's content.
    FileUpload,
    /// Produced by a direct LLM extraction call.
    LlmExtractor,
    /// Produced by a deterministic rule matcher.
    Rule,
}

/// Triage state of an [`IntentSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSignalStatus {
    /// Not yet reviewed.
    Candidate,
    /// Folded into an IntentCard.
    Accepted,
    /// Explicitly dismissed.
    Ignored,
}

/// One mutation IntentSteward proposes to the IntentCard set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentOperation {
    /// Create a new card, or update an existing one.
    #[serde(rename = "type")]
    pub op_type: IntentOperationType,
    /// The card to update; absent for `Create`.
    pub intent_id: Option<IntentCardId>,
    /// The proposed card fields.
    pub data: serde_json::Value,
    /// The signals this operation is grounded on.
    pub relation_signals: Vec<IntentSignalId>,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Free-text justification, carried into audit.
    pub reasoning: String,
}

/// Kind of [`IntentOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentOperationType {
    /// Create a new IntentCard.
    CreateIntentCard,
    /// Update an existing IntentCard.
    UpdateIntentCard,
}

/// How a signal was disposed of by one IntentSteward run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMappingEntry {
    /// The signal this entry concerns.
    pub signal_id: IntentSignalId,
    /// What happened to it (`created`, `updated`, `ephemeral`).
    pub action: String,
    /// The card it was folded into, if any.
    pub target_intent_id: Option<IntentCardId>,
    /// Free-text justification.
    pub reasoning: String,
}

/// Output of one IntentSteward run (§3 IntentLayoutPlan).
///
/// Caps: at most 3 creates and 5 updates per plan (§8 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentLayoutPlan {
    /// Proposed mutations to long-lived IntentCards.
    pub long_term_intents: Vec<IntentOperation>,
    /// Signals that did not warrant a durable card this run.
    pub ephemeral_tasks: Vec<serde_json::Value>,
    /// Per-signal disposition.
    pub signal_mapping: Vec<SignalMappingEntry>,
    /// Free-form run metadata (counts, heuristic-vs-LLM path taken, etc.).
    pub metadata: serde_json::Value,
}

impl IntentLayoutPlan {
    /// Number of CREATE operations in this plan.
    pub fn create_count(&self) -> usize {
        self.long_term_intents
            .iter()
            .filter(|op| op.op_type == IntentOperationType::CreateIntentCard)
            .count()
    }

    /// Number of UPDATE operations in this plan.
    pub fn update_count(&self) -> usize {
        self.long_term_intents
            .iter()
            .filter(|op| op.op_type == IntentOperationType::UpdateIntentCard)
            .count()
    }

    /// Whether this plan respects the §8 create/update caps.
    pub fn within_caps(&self) -> bool {
        self.create_count() <= 3 && self.update_count() <= 5
    }
}

/// Which phase produced an [`IntentLog`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLogPhase {
    /// An Intent Pipeline run (§4.F).
    Pipeline,
    /// An IntentSteward run in observation mode (§4.L).
    Phase1Observation,
    /// An IntentSteward run in execution mode (§4.L).
    Phase2Execution,
}

/// Append-only audit record of one Intent Pipeline or IntentSteward run
/// (§3 IntentLog).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentLog {
    /// Identifier, unique process-wide.
    pub id: IntentLogId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// The raw input analysed.
    pub raw_input: String,
    /// The channel the input arrived on (`api`, `chat_app`, …).
    pub channel: String,
    /// Opaque per-layer decision map.
    pub pipeline_steps: serde_json::Value,
    /// Opaque final-decision map (selected layer outputs, method, confidence).
    pub final_decision: serde_json::Value,
    /// Attached later by offline evaluation tooling; never mutates the
    /// original fields above.
    pub user_override: Option<serde_json::Value>,
    /// Which phase produced this entry.
    pub phase: IntentLogPhase,
    /// Write timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
}
