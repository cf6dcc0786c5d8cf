//! Project assignment detector (§4.H step 3): "if the UI supplied a project
//! id, use it; else run a project detector against recent activity; else
//! none."

use std::collections::HashMap;

use cco_proto::{ChatMessage, Event, Provider, ProjectAssignmentDecision, ProjectId};

/// A detected assignment is trusted without a confirmation prompt once its
/// supporting fraction of recent activity reaches this threshold.
const CONFIDENT_THRESHOLD: f32 = 0.6;

/// Below this fraction the top candidate and the runner-up are close enough
/// that an LLM tiebreak is attempted before falling back to the top count.
const TIEBREAK_THRESHOLD: f32 = 0.6;

/// Resolve the project a turn should be scoped to.
///
/// `recent_events` is whatever window of recent Event Log rows the caller
/// already fetched for this workspace (the pipeline re-reads the log for
/// several purposes within one turn, so step 3 reuses rather than re-fetches
/// it). Only events carrying a `project_id` contribute to the count.
pub async fn assign_project(
    explicit_project_id: Option<ProjectId>,
    recent_events: &[Event],
    use_llm: bool,
    provider: Option<&dyn Provider>,
    model: &str,
) -> ProjectAssignmentDecision {
    if let Some(project_id) = explicit_project_id {
        return ProjectAssignmentDecision {
            project_id: Some(project_id),
            relation: "explicit".to_string(),
            confidence: 1.0,
            requires_ui_confirmation: false,
        };
    }

    let mut counts: HashMap<&ProjectId, u32> = HashMap::new();
    for event in recent_events {
        if let Some(project_id) = &event.project_id {
            *counts.entry(project_id).or_insert(0) += 1;
        }
    }

    if counts.is_empty() {
        return ProjectAssignmentDecision {
            project_id: None,
            relation: "none".to_string(),
            confidence: 0.0,
            requires_ui_confirmation: false,
        };
    }

    let total: u32 = counts.values().sum();
    let mut ranked: Vec<(&ProjectId, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let (top_id, top_count) = ranked[0];
    let fraction = top_count as f32 / total as f32;

    if fraction >= CONFIDENT_THRESHOLD {
        return ProjectAssignmentDecision {
            project_id: Some(top_id.clone()),
            relation: "detected".to_string(),
            confidence: fraction,
            requires_ui_confirmation: fraction < 0.8,
        };
    }

    if fraction < TIEBREAK_THRESHOLD && use_llm && ranked.len() > 1 {
        if let Some(provider) = provider {
            if let Some(chosen) = tiebreak_via_provider(provider, model, &ranked).await {
                return ProjectAssignmentDecision {
                    project_id: Some(chosen),
                    relation: "detected".to_string(),
                    confidence: 0.5,
                    requires_ui_confirmation: true,
                };
            }
        }
    }

    ProjectAssignmentDecision {
        project_id: Some(top_id.clone()),
        relation: "detected".to_string(),
        confidence: fraction,
        requires_ui_confirmation: true,
    }
}

async fn tiebreak_via_provider(
    provider: &dyn Provider,
    model: &str,
    ranked: &[(&ProjectId, u32)],
) -> Option<ProjectId> {
    let candidates: Vec<String> =
        ranked.iter().map(|(id, count)| format!("{id} (recent mentions: {count})")).collect();
    let prompt = format!(
        "Recent activity is split across these project candidates:\n{}\n\
         Reply with exactly one candidate's project id and nothing else.",
        candidates.join("\n")
    );
    let messages = vec![
        ChatMessage::system("You disambiguate which project a conversation turn belongs to."),
        ChatMessage::user(prompt),
    ];
    let completion = provider.chat_completion(messages, model, Some(0.0), Some(64)).await.ok()?;
    let answer = completion.text.trim();
    ranked.iter().find(|(id, _)| answer.contains(id.as_str())).map(|(id, _)| (*id).clone())
}
