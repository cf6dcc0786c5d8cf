//! IntentSteward input/output shapes (§4.L).

use cco_proto::{MessageId, ProfileId, WorkspaceId};

/// Input to one [`crate::IntentSteward::analyze_turn`] run.
#[derive(Debug, Clone)]
pub struct AnalyzeTurnInput {
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// The turn this run is scoped to.
    pub turn_id: MessageId,
    /// Opaque conversation correlator, carried into the audit log only.
    pub conversation_id: Option<String>,
    /// Resolved workspace-scoped `auto_intent_layout` flag (§6.4). The
    /// steward itself holds no workspace-settings port; callers resolve this
    /// before invoking a run and pass it straight through, the same way a
    /// Plan Builder input carries `use_llm` directly rather than looking it
    /// up.
    pub auto_intent_layout: bool,
}
