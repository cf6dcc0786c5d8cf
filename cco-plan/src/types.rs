//! Plan Builder input shapes (§4.G).

use cco_proto::{MessageId, PlaybookMetadata, ProfileId, ProjectId, WorkspaceId};

/// One file attached to the turn, reduced to what the fallback planner
/// needs: an opaque id and a MIME type to classify.
#[derive(Debug, Clone)]
pub struct PlanInputFile {
    /// Opaque file identifier.
    pub id: String,
    /// MIME type as reported by the upload handler.
    pub mime_type: String,
}

/// Everything the Plan Builder needs to produce one [`cco_proto::ExecutionPlan`].
#[derive(Debug, Clone)]
pub struct PlanBuilderInput {
    /// The user's raw turn text.
    pub message: String,
    /// Files attached to this turn.
    pub files: Vec<PlanInputFile>,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// The turn this plan is scoped to.
    pub message_id: MessageId,
    /// Whether the LLM path may be consulted at all.
    pub use_llm: bool,
    /// The project this turn is scoped to, if any.
    pub project_id: Option<ProjectId>,
    /// The playbook set an LLM-produced task's `pack_id` is validated
    /// against (§4.G step 1).
    pub effective_playbooks: Vec<PlaybookMetadata>,
    /// Artifact names the workspace still expects, consulted by the
    /// deterministic fallback planner (§4.G step 2c).
    pub expected_artifacts: Vec<String>,
}
