//! Playbook manifests and the plan shape they can expand to (§3 Playbook,
//! ExecutionPlan, §4.D).

use serde::{Deserialize, Serialize};

/// Whether a playbook is user-authored or a built-in system capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybookKind {
    /// Authored by a user or capability pack.
    UserWorkflow,
    /// A built-in capability the core ships with.
    SystemTool,
}

/// How a playbook is allowed to surface in conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Runs without narrating its own steps.
    Silent,
    /// Runs but requires human review of its output.
    NeedsReview,
    /// Surfaces as ordinary chat turns.
    Conversational,
}

/// One step of a playbook's structured workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// The playbook this step targets.
    pub playbook_code: String,
    /// Kind of the targeted playbook.
    pub kind: PlaybookKind,
    /// Allowed interaction modes for this step.
    pub interaction_mode: Vec<InteractionMode>,
    /// Input values for this step, opaque to the registry.
    pub inputs: serde_json::Value,
    /// Mapping from upstream step outputs into this step's inputs.
    pub input_mapping: serde_json::Value,
}

/// Metadata + optional structured workflow for a discoverable unit of work
/// (§3 Playbook).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    /// Globally unique code within an effective scope.
    pub playbook_code: String,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Free-form tags used in selection prompts.
    pub tags: Vec<String>,
    /// Artifact types this playbook can produce.
    pub output_types: Vec<String>,
    /// Authored vs. built-in.
    pub kind: PlaybookKind,
    /// Allowed interaction modes.
    pub interaction_mode: Vec<InteractionMode>,
    /// Structured workflow, if this playbook is more than conversational.
    pub steps: Option<Vec<WorkflowStep>>,
}

impl Playbook {
    /// Whether a structured `HandoffPlan` can be generated from this
    /// playbook (§4.D `PlaybookRun.has_json()`).
    pub fn has_json(&self) -> bool {
        self.steps.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Lightweight projection of a [`Playbook`] used in selection prompts and
/// registry listings, without the (possibly large) structured workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookMetadata {
    /// Globally unique code.
    pub playbook_code: String,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Which discovery source supplied the currently-effective definition.
    pub source: PlaybookSource,
}

/// §4.D discovery order, low to high priority. This expansion's adopted
/// resolution to the registry's Open Question (§9): a later source's
/// definition fully replaces an earlier one on code collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybookSource {
    /// Shipped with the process.
    BuiltIn,
    /// Declared by an installed capability pack.
    CapabilityPack,
    /// A row in the user's own store.
    UserDefined,
}

/// A resolved, possibly-absent playbook plus its structured workflow, as
/// returned by `load_run` (§4.D).
#[derive(Debug, Clone)]
pub struct PlaybookRun {
    /// The resolved playbook.
    pub playbook: Playbook,
}

impl PlaybookRun {
    /// See [`Playbook::has_json`].
    pub fn has_json(&self) -> bool {
        self.playbook.has_json()
    }
}
