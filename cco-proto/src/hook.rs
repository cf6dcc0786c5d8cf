//! HookRun ledger and receipt validation types (§3, §4.J, §4.K).

use crate::id::WorkspaceId;
use serde::{Deserialize, Serialize};

/// Terminal outcome of one hook execution, as recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookRunStatus {
    /// The hook body ran to completion.
    Completed,
    /// The hook body raised; the error is swallowed (§4.J step 4) but the
    /// attempt still counts for idempotency purposes.
    Failed,
}

/// Idempotency ledger row (§3 HookRun).
///
/// Invariant: `idempotency_key` is unique; a second call with the same key
/// returns the stored `result_summary` without re-executing (§8 property).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookRun {
    /// `sha256("{workspace_id}:{message_id}:{step}")[:48]` (§4.J step 3).
    pub idempotency_key: String,
    /// Which hook this row records (`intent_extract`, `steward_analyze`).
    pub hook_type: String,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// Terminal outcome.
    pub status: HookRunStatus,
    /// The hook's return value (or error summary, on `Failed`).
    pub result_summary: serde_json::Value,
    /// Write timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Why a receipt evaluation decided to run or skip a hook (§3 ReceiptDecision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptReason {
    /// No receipt was supplied for this step.
    NoReceipt,
    /// A receipt was supplied but had an empty `trace_id`.
    MissingTraceId,
    /// A receipt's `output_hash` failed the `^[0-9a-fA-F]{16,64}$` check.
    InvalidOutputHash,
    /// A receipt's `completed_at` parsed but lies in the future.
    FutureCompletedAt,
    /// All checks passed; the hook is skipped.
    ReceiptAccepted,
}

/// A caller-supplied IDE attestation that a step has already run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Which hook step this receipt attests to.
    pub step: String,
    /// Cross-system correlation id.
    pub trace_id: String,
    /// Hex digest of the step's output, `[0-9a-fA-F]{16,64}`.
    pub output_hash: String,
    /// When the IDE-side step completed, if known.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Ephemeral structured result of receipt validation (§3 ReceiptDecision).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptDecision {
    /// The hook step this decision concerns.
    pub step: String,
    /// Whether the hook should execute.
    pub should_run: bool,
    /// Why `should_run` has the value it has.
    pub reason: ReceiptReason,
    /// The receipt's `trace_id`, when one was supplied.
    pub receipt_trace_id: Option<String>,
    /// The receipt's `output_hash`, when one was supplied.
    pub receipt_output_hash: Option<String>,
}

/// Aggregated results from all hooks in one `on_chat_synced` cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookResults {
    /// Signals produced by `intent_extract`, if it ran.
    pub intent_tags: Option<Vec<crate::intent::IntentSignal>>,
    /// Layout produced by `steward_analyze`, if it ran.
    pub layout_plan: Option<crate::intent::IntentLayoutPlan>,
    /// Hooks that actually executed (post-receipt, post-gate, post-idempotency).
    pub triggered_hooks: Vec<String>,
    /// Hooks that were skipped, with the reason implicit in the receipt/gate logs.
    pub skipped_hooks: Vec<String>,
    /// Event ids emitted during this cycle.
    pub events_emitted: Vec<String>,
    /// One [`ReceiptDecision`] per hook step evaluated.
    pub receipt_decisions: Vec<ReceiptDecision>,
}

/// Which fallback tier produced a [`SamplingResult`] (§4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingSource {
    /// The primary MCP sampling call succeeded.
    McpSampling,
    /// Tier-2: the workspace-side LLM path was used instead.
    WsLlm,
    /// Tier-3: a human-review placeholder was created.
    PendingCard,
}

/// Outcome of one [`with_fallback`](crate::sampling::SamplingGate) call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingResult {
    /// Which tier ultimately produced `data`.
    pub source: SamplingSource,
    /// The tier's output, opaque to the gate.
    pub data: Option<serde_json::Value>,
    /// Accumulated skip/failure reasons from every tier that was tried
    /// before the one that succeeded (§4.K: appended, not overwritten).
    pub error: Option<String>,
    /// Wall-clock latency of the whole call, in milliseconds.
    pub latency_ms: u64,
}
