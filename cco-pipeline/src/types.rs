//! Intent Pipeline input/output shapes (§4.F).

use cco_proto::{MessageId, ProfileId, WorkspaceId, WorkflowStep};

/// Layer 1 output: what kind of thing the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    /// An ordinary question, answered conversationally.
    Qa,
    /// A request to run a playbook.
    StartPlaybook,
    /// A request to change workspace/profile settings.
    ManageSettings,
    /// Neither rule nor LLM matcher produced a confident classification.
    Unknown,
}

impl InteractionType {
    /// Parse a layer-1 tag string, case-insensitively. Unrecognised input
    /// maps to [`InteractionType::Unknown`] rather than failing the layer.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "qa" => Self::Qa,
            "start_playbook" => Self::StartPlaybook,
            "manage_settings" => Self::ManageSettings,
            _ => Self::Unknown,
        }
    }

    /// The wire tag for this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qa => "qa",
            Self::StartPlaybook => "start_playbook",
            Self::ManageSettings => "manage_settings",
            Self::Unknown => "unknown",
        }
    }
}

/// Layer 2 output: which domain of task the user's playbook request falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskDomain {
    /// Drafting a business proposal.
    ProposalWriting,
    /// Compiling a yearly review.
    YearlyReview,
    /// Building or tracking a habit.
    HabitLearning,
    /// Planning a project.
    ProjectPlanning,
    /// Drafting other written content.
    ContentWriting,
    /// No domain matched with enough confidence.
    Unknown,
}

impl TaskDomain {
    /// Parse a layer-2 tag string, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "proposal_writing" => Self::ProposalWriting,
            "yearly_review" => Self::YearlyReview,
            "habit_learning" => Self::HabitLearning,
            "project_planning" => Self::ProjectPlanning,
            "content_writing" => Self::ContentWriting,
            _ => Self::Unknown,
        }
    }

    /// The wire tag for this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProposalWriting => "proposal_writing",
            Self::YearlyReview => "yearly_review",
            Self::HabitLearning => "habit_learning",
            Self::ProjectPlanning => "project_planning",
            Self::ContentWriting => "content_writing",
            Self::Unknown => "unknown",
        }
    }
}

/// Which matcher produced a layer's decision, recorded in the decision log
/// (§4.F "decision coordinator").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMethod {
    /// A closed-set regex/prefix rule matched.
    RuleBased,
    /// The Provider was consulted and returned a usable answer.
    LlmBased,
    /// The LLM path was unavailable or failed; a conservative rule default
    /// was used instead.
    RuleBasedFallback,
    /// Neither matcher ran (e.g. layer not applicable).
    None,
}

impl DecisionMethod {
    /// The wire tag for this variant, used in `final_decision.method`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuleBased => "rule_based",
            Self::LlmBased => "llm_based",
            Self::RuleBasedFallback => "rule_based_fallback",
            Self::None => "none",
        }
    }
}

/// One layer's resolved decision plus provenance, folded into `pipeline_steps`.
#[derive(Debug, Clone)]
pub struct LayerDecision {
    /// The layer's output tag.
    pub value: String,
    /// Which matcher produced it.
    pub method: DecisionMethod,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Arbitration switches the coordinator consults before invoking the LLM
/// matcher for a layer (§4.F "arbitrates matchers by `(use_llm, rule_priority)`").
#[derive(Debug, Clone, Copy)]
pub struct ArbitrationPolicy {
    /// Whether the LLM matcher may be consulted at all.
    pub use_llm: bool,
    /// Whether a rule hit should short-circuit the LLM matcher.
    pub rule_priority: bool,
}

impl Default for ArbitrationPolicy {
    fn default() -> Self {
        Self { use_llm: true, rule_priority: true }
    }
}

/// Input to one Intent Pipeline analysis run.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Raw user utterance.
    pub raw_input: String,
    /// Originating channel (`api`, `chat_app`, …); used by layer 1's
    /// channel-specific prefix rule.
    pub channel: String,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// The turn this analysis is scoped to.
    pub message_id: MessageId,
    /// Locale used for playbook lookups.
    pub locale: String,
    /// Matcher arbitration switches.
    pub policy: ArbitrationPolicy,
}

/// A proposed multi-playbook workflow (§4.F "multi-step detection",
/// §9 HandoffPlan).
#[derive(Debug, Clone)]
pub struct HandoffPlan {
    /// The ordered steps the Workflow Orchestrator should execute.
    pub steps: Vec<WorkflowStep>,
    /// Opaque map of step-id to the step-ids it depends on.
    pub step_dependencies: serde_json::Value,
}

/// Result of one Intent Pipeline run (§4.F).
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Layer 1 decision.
    pub interaction_type: LayerDecision,
    /// Layer 2 decision, only populated when layer 1 was `start_playbook`.
    pub task_domain: Option<LayerDecision>,
    /// Layer 3 decision: the selected playbook code, if any was legal.
    pub selected_playbook_code: Option<String>,
    /// Layer 3 confidence (0.8 on a legal pick, 0.0 on no selection).
    pub playbook_confidence: f32,
    /// Populated when the pipeline determined the request spans multiple
    /// playbooks.
    pub handoff_plan: Option<HandoffPlan>,
    /// Opaque, ready-to-persist per-layer decision map (`IntentLog.pipeline_steps`).
    pub pipeline_steps: serde_json::Value,
    /// Opaque, ready-to-persist final-decision map (`IntentLog.final_decision`).
    pub final_decision: serde_json::Value,
}
