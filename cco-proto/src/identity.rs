//! Identity and Intent Registry port payloads (§6.2, §4.Q).

use crate::id::{ProfileId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// The execution identity a turn runs under, returned by [`crate::ports::IdentityPort`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// The actor (user/service account) this turn executes as.
    pub actor_id: String,
    /// The workspace this context is scoped to.
    pub workspace_id: WorkspaceId,
    /// Free-form capability/role tags.
    pub tags: Vec<String>,
    /// Optional steering hint carried through to prompt construction.
    pub mind_lens: Option<String>,
}

/// A single definition in an [`IntentRegistryPort`](crate::ports::IntentRegistryPort)'s
/// catalogue, returned by `list_available_intents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDefinition {
    /// Short machine-readable name.
    pub name: String,
    /// Human-readable description used in few-shot prompts.
    pub description: String,
    /// Free-form category/theme tags.
    pub themes: Vec<String>,
}

/// Result of resolving free-text user input into intents/themes (§6.2
/// `IntentRegistryPort::resolve_intent`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResolvedIntent {
    /// Matched intent names.
    pub intents: Vec<String>,
    /// Matched theme labels.
    pub themes: Vec<String>,
    /// Confidence in the resolution, when the implementation can produce one.
    pub confidence: Option<f32>,
    /// Raw LLM analysis text, when an LLM-backed registry produced this result.
    pub llm_analysis: Option<String>,
}

/// Profile-scoped request context threaded through port calls that need to
/// know who is asking, without requiring a full [`ExecutionContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortContext {
    /// The workspace in scope.
    pub workspace_id: WorkspaceId,
    /// The profile in scope, when known.
    pub profile_id: Option<ProfileId>,
}
