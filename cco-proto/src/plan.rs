//! The per-turn plan produced by the Plan Builder (§3 ExecutionPlan, §4.G).

use crate::id::{MessageId, PlanId, ProjectId, WorkspaceId};
use crate::task::TaskPlan;
use serde::{Deserialize, Serialize};

/// One textual step of an ExecutionPlan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Identifier unique within the plan.
    pub step_id: String,
    /// The playbook or capability this step targets.
    pub pack_id: String,
    /// Human-readable goal for this step.
    pub goal: String,
    /// Template used to build this step's task inputs.
    pub input_template: serde_json::Value,
}

/// Deterministic outcome of project assignment (§4.H step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAssignmentDecision {
    /// The project assigned, if any.
    pub project_id: Option<ProjectId>,
    /// How the project was related to this turn (`explicit`, `detected`, `none`).
    pub relation: String,
    /// Confidence in the assignment, `[0, 1]`.
    pub confidence: f32,
    /// Whether the UI must surface a confirmation before acting on this
    /// assignment.
    pub requires_ui_confirmation: bool,
}

/// The per-turn plan produced by the Plan Builder (§3 ExecutionPlan).
///
/// Invariant: every task's `pack_id` is present in the effective playbook
/// set or is a well-known capability code (enforced by the Plan Builder,
/// not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Identifier, unique process-wide.
    pub id: PlanId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The turn that produced this plan.
    pub message_id: MessageId,
    /// Ordered textual steps.
    pub steps: Vec<PlanStep>,
    /// Tasks to dispatch.
    pub tasks: Vec<TaskPlan>,
    /// Names of AI team members / personas assigned to this plan, if any.
    pub ai_team_members: Vec<String>,
    /// One-paragraph summary of what the plan will do.
    pub plan_summary: String,
    /// One-paragraph restatement of the user's request.
    pub user_request_summary: String,
    /// The project this plan is scoped to, if assigned.
    pub project_id: Option<ProjectId>,
    /// How the project was assigned, if applicable.
    pub project_assignment_decision: Option<ProjectAssignmentDecision>,
}
