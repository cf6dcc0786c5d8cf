//! LLM-backed plan construction (§4.G step 1).

use cco_proto::{ChatMessage, PlaybookMetadata, Provider, ProviderError, SideEffectLevel, TaskPlan};

use crate::rules::{is_well_known_pack, CONTENT_DRAFTING_PACK};
use crate::types::PlanBuilderInput;

const MAX_RESPONSE_TOKENS: u32 = 1200;

/// Everything the builder needs out of one LLM plan call, already split
/// from the raw JSON envelope.
pub struct LlmPlan {
    /// Raw step objects, passed through to [`cco_proto::PlanStep`] construction.
    pub steps: Vec<serde_json::Value>,
    /// Tasks, each already validated against the effective playbook set.
    pub tasks: Vec<TaskPlan>,
    /// Assigned persona names, if any.
    pub ai_team_members: Vec<String>,
    /// One-paragraph plan summary.
    pub plan_summary: String,
    /// One-paragraph restatement of the user's request.
    pub user_request_summary: String,
}

fn parse_side_effect_level(raw: &str) -> SideEffectLevel {
    match raw {
        "soft_write" => SideEffectLevel::SoftWrite,
        "external_write" => SideEffectLevel::ExternalWrite,
        _ => SideEffectLevel::Readonly,
    }
}

/// Validate one LLM-produced task's `pack_id` against the effective
/// playbook set plus the well-known capability codes, substituting the
/// content-drafting fallback on an illegal pick (§4.G step 1).
fn validated_task(raw: &serde_json::Value, playbooks: &[PlaybookMetadata]) -> TaskPlan {
    let requested = raw["pack_id"].as_str().unwrap_or(CONTENT_DRAFTING_PACK);
    let legal = is_well_known_pack(requested) || playbooks.iter().any(|p| p.playbook_code == requested);

    let pack_id = if legal {
        requested.to_string()
    } else {
        tracing::warn!(
            pack_id = requested,
            "LLM plan task targeted a pack outside the effective set, substituting {}",
            CONTENT_DRAFTING_PACK
        );
        CONTENT_DRAFTING_PACK.to_string()
    };

    TaskPlan {
        pack_id,
        task_type: raw["task_type"].as_str().unwrap_or("draft_artifact").to_string(),
        params: raw.get("params").cloned().unwrap_or(serde_json::Value::Null),
        side_effect_level: parse_side_effect_level(raw["side_effect_level"].as_str().unwrap_or("readonly")),
        auto_execute: raw["auto_execute"].as_bool(),
        requires_cta: raw["requires_cta"].as_bool(),
    }
}

fn build_prompt(input: &PlanBuilderInput) -> Vec<ChatMessage> {
    let system = "You are a planning assistant. Read the user's request and reply with a \
         JSON object only, no prose, shaped as: {\"steps\": [{\"step_id\": \"...\", \
         \"pack_id\": \"...\", \"goal\": \"...\", \"input_template\": {}}], \"tasks\": \
         [{\"pack_id\": \"...\", \"task_type\": \"...\", \"params\": {}, \
         \"side_effect_level\": \"readonly|soft_write|external_write\", \
         \"auto_execute\": bool?, \"requires_cta\": bool?}], \"ai_team_members\": [\"...\"], \
         \"plan_summary\": \"...\", \"user_request_summary\": \"...\"}. Every task's \
         pack_id must come from the available playbooks list below, or be one of the \
         well-known capability codes file_analysis, image_analysis, document_analysis, \
         content_drafting.";

    let mut user = format!("User request: {}\n", input.message);
    if !input.files.is_empty() {
        user.push_str(&format!("Attached files: {}\n", input.files.len()));
    }
    if !input.effective_playbooks.is_empty() {
        user.push_str("Available playbooks:\n");
        for p in &input.effective_playbooks {
            user.push_str(&format!("- {} (\"{}\"): {}\n", p.playbook_code, p.name, p.description));
        }
    }

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Ask the Provider to build a structured plan and validate every task's
/// `pack_id`. A transport failure or an unparsable response is returned as
/// an error so the builder can fall through to the deterministic planner.
pub async fn build_plan(
    provider: &dyn Provider,
    model: &str,
    input: &PlanBuilderInput,
) -> Result<LlmPlan, ProviderError> {
    let messages = build_prompt(input);
    let completion = provider.chat_completion(messages, model, None, Some(MAX_RESPONSE_TOKENS)).await?;

    let value: serde_json::Value = serde_json::from_str(completion.text.trim())
        .map_err(|e| ProviderError::BadResponse(format!("unparsable plan JSON: {e}")))?;

    let steps = value["steps"].as_array().cloned().unwrap_or_default();
    let tasks = value["tasks"]
        .as_array()
        .map(|tasks| tasks.iter().map(|t| validated_task(t, &input.effective_playbooks)).collect())
        .unwrap_or_default();
    let ai_team_members = value["ai_team_members"]
        .as_array()
        .map(|members| members.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let plan_summary = value["plan_summary"].as_str().unwrap_or_default().to_string();
    let user_request_summary = value["user_request_summary"].as_str().unwrap_or_default().to_string();

    Ok(LlmPlan { steps, tasks, ai_team_members, plan_summary, user_request_summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::PlaybookSource;

    fn playbooks() -> Vec<PlaybookMetadata> {
        vec![PlaybookMetadata {
            playbook_code: "proposal_v1".into(),
            name: "Proposal writer".into(),
            description: "Drafts a proposal".into(),
            tags: vec!["proposal_writing".into()],
            source: PlaybookSource::BuiltIn,
        }]
    }

    #[test]
    fn legal_pack_id_passes_through() {
        let raw = serde_json::json!({ "pack_id": "proposal_v1", "task_type": "run" });
        let task = validated_task(&raw, &playbooks());
        assert_eq!(task.pack_id, "proposal_v1");
    }

    #[test]
    fn well_known_pack_id_passes_through() {
        let raw = serde_json::json!({ "pack_id": "file_analysis", "task_type": "run" });
        let task = validated_task(&raw, &playbooks());
        assert_eq!(task.pack_id, "file_analysis");
    }

    #[test]
    fn illegal_pack_id_is_substituted() {
        let raw = serde_json::json!({ "pack_id": "not_a_real_pack", "task_type": "run" });
        let task = validated_task(&raw, &playbooks());
        assert_eq!(task.pack_id, CONTENT_DRAFTING_PACK);
    }
}
