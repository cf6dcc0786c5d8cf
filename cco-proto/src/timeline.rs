//! Derived UI "result cards" (§3 TimelineItem, §4.C).

use crate::id::{MessageId, TaskId, TimelineItemId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// The closed set of card kinds surfaced in the UI right-panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineItemType {
    /// Pre-pipeline intent extraction output (§4.H step 6).
    IntentSeeds,
    /// A generated daily plan artifact.
    DailyPlan,
    /// A drafted piece of content.
    ContentDraft,
    /// Anything else a playbook produces, tagged with its own name.
    Other(String),
}

/// A confirmation/suggestion action attached to a timeline item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cta {
    /// Human-readable button label.
    pub label: String,
    /// Action identifier dispatched back through the CTA Handler.
    pub action: String,
    /// The playbook or capability this action would run.
    pub pack_id: Option<String>,
}

/// A derived "card" projected from tasks/events into the UI (§3 TimelineItem).
///
/// Invariant: for any task with `side_effect_level != readonly` and
/// user-visible output, `cta` contains at least one explicit confirmation
/// action (enforced by the Plan Builder and Task dispatch, not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineItem {
    /// Identifier, unique process-wide.
    pub id: TimelineItemId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The turn that produced this item.
    pub message_id: MessageId,
    /// The task this item projects, if any (intent extraction has none).
    pub task_id: Option<TaskId>,
    /// Card kind.
    pub item_type: TimelineItemType,
    /// Short display title.
    pub title: String,
    /// Short display summary.
    pub summary: String,
    /// Full card payload, opaque to the store.
    pub data: serde_json::Value,
    /// Confirmation/suggestion actions, if any.
    pub cta: Option<Vec<Cta>>,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
}
