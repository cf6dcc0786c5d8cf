//! Units of work spawned by an ExecutionPlan (§3 Task, §4.B).

use crate::id::{ExecutionId, MessageId, TaskId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// How far a task has progressed. Transitions are monotonic:
/// `Pending -> Running -> (Succeeded | Failed | Skipped)`; a terminal status
/// never reverts (§3 Task invariant, §8 property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not yet dispatched.
    Pending,
    /// Dispatched and in flight.
    Running,
    /// Reached a terminal, successful state.
    Succeeded,
    /// Reached a terminal, unsuccessful state.
    Failed,
    /// Cancelled before it started running.
    Skipped,
}

impl TaskStatus {
    /// Terminal statuses never accept a further write (§8 invariant).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        use TaskStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Skipped) | (Running, Succeeded) | (Running, Failed) | (Running, Skipped)
        )
    }
}

/// How much real-world effect a task may have, driving `auto_execute` and
/// `requires_cta` defaults (§4.G.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectLevel {
    /// No observable effect outside the workspace's own derived state.
    Readonly,
    /// Writes within the workspace (timeline items, intent signals).
    SoftWrite,
    /// Writes visible outside the workspace (emails sent, files uploaded
    /// elsewhere); always requires an explicit confirmation CTA.
    ExternalWrite,
}

/// A unit of work spawned by a plan (§3 Task).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique process-wide.
    pub id: TaskId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The turn that produced this task.
    pub message_id: MessageId,
    /// Opaque correlator shared by every task dispatched from the same plan.
    pub execution_id: ExecutionId,
    /// The playbook or well-known capability code this task runs.
    pub pack_id: String,
    /// Vendor-specific task kind within `pack_id`.
    pub task_type: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Input parameters, opaque to the Task Store.
    pub params: serde_json::Value,
    /// Output, populated once terminal.
    pub result: Option<serde_json::Value>,
    /// Effect budget for this task (§3).
    pub side_effect_level: SideEffectLevel,
    /// Whether the task may run without a human confirming first.
    pub auto_execute: bool,
    /// Whether the UI must present a confirmation CTA before any visible
    /// effect is allowed to happen.
    pub requires_cta: bool,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Set exactly when status transitions to `Running`.
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Set exactly when status becomes terminal.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Populated on `Failed`.
    pub error: Option<String>,
}

impl Task {
    /// Derive the `auto_execute`/`requires_cta` defaults from a side-effect
    /// level, per §4.G.3: `auto_execute = (level == readonly)`.
    pub fn defaults_for(level: SideEffectLevel) -> (bool, bool) {
        let auto_execute = matches!(level, SideEffectLevel::Readonly);
        (auto_execute, !auto_execute)
    }
}

/// A planned-but-not-yet-materialised task, carried inside an ExecutionPlan
/// (§3 ExecutionPlan, TaskPlan).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    /// The playbook or capability code this task will run.
    pub pack_id: String,
    /// Vendor-specific task kind.
    pub task_type: String,
    /// Input parameters for the eventual `Task`.
    pub params: serde_json::Value,
    /// Effect budget.
    pub side_effect_level: SideEffectLevel,
    /// Explicit override of the side-effect-derived default, if the plan set one.
    pub auto_execute: Option<bool>,
    /// Explicit override of the side-effect-derived default, if the plan set one.
    pub requires_cta: Option<bool>,
}
