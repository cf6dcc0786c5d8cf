//! Typed prompt builders for the Sampling Gate's allowed templates (§4.K
//! "Prompt builders"). Each returns an MCP `createMessage`-shaped request so
//! the same value can be handed either to an MCP sampling call or, unchanged,
//! to the tier-2 workspace-side provider call.

use cco_proto::ChatMessage;

/// One allowed Sampling Gate template, matched against
/// `ConfigSnapshot::template_allowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// §4.J `intent_extract` hook body.
    IntentExtract,
    /// §4.J `steward_analyze` hook body.
    StewardAnalyze,
    /// §4.C Plan Builder's LLM path.
    PlanBuild,
    /// An agent task's own LLM dispatch.
    AgentTaskDispatch,
}

impl Template {
    /// The string form stored in `ALLOWED_TEMPLATES` and on ledger rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::IntentExtract => "intent_extract",
            Template::StewardAnalyze => "steward_analyze",
            Template::PlanBuild => "plan_build",
            Template::AgentTaskDispatch => "agent_task_dispatch",
        }
    }
}

/// An MCP `createMessage`-shaped sampling request: role-tagged messages plus
/// the two fields every vendor call needs regardless of transport.
#[derive(Debug, Clone)]
pub struct SamplingRequest {
    /// The template this request was built for.
    pub template: Template,
    /// Role-tagged conversation turns.
    pub messages: Vec<ChatMessage>,
    /// System prompt, carried separately so an MCP client and a direct
    /// Provider call can each fold it in their own way.
    pub system_prompt: String,
    /// Response length cap.
    pub max_tokens: u32,
}

/// Build the request for the `intent_extract` hook: pull free-standing goals
/// and preferences out of one turn's raw text.
pub fn build_intent_extract_prompt(turn_text: &str) -> SamplingRequest {
    let system_prompt = "Extract any durable goals, preferences, or commitments expressed in \
         this message. Reply with JSON only: {\"signals\": [{\"label\": \"...\", \"confidence\": \
         0.0-1.0}]}. If nothing durable is present, reply {\"signals\": []}."
        .to_string();
    SamplingRequest {
        template: Template::IntentExtract,
        messages: vec![ChatMessage::user(turn_text)],
        system_prompt,
        max_tokens: 400,
    }
}

/// Build the request for the `steward_analyze` hook's LLM layout pass.
pub fn build_steward_analyze_prompt(context: &str) -> SamplingRequest {
    let system_prompt = "You maintain a user's long-term IntentCards from recent candidate \
         signals and conversation context. Reply with JSON only, per the \
         CREATE_INTENT_CARD/UPDATE_INTENT_CARD operation schema."
        .to_string();
    SamplingRequest {
        template: Template::StewardAnalyze,
        messages: vec![ChatMessage::user(context)],
        system_prompt,
        max_tokens: 800,
    }
}

/// Build the request an agent task uses to ask the client's IDE LLM to
/// dispatch a sub-task, rather than routing through the workspace Provider.
pub fn build_agent_task_dispatch_prompt(task_description: &str, params: &serde_json::Value) -> SamplingRequest {
    let system_prompt =
        "Execute the described task and reply with JSON only: {\"result\": {...}, \"artifacts\": [...]}."
            .to_string();
    let user_content = format!("Task: {task_description}\nParameters: {params}");
    SamplingRequest {
        template: Template::AgentTaskDispatch,
        messages: vec![ChatMessage::user(user_content)],
        system_prompt,
        max_tokens: 1200,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_extract_prompt_is_user_scoped_to_the_turn_text() {
        let req = build_intent_extract_prompt("I want to launch the product next quarter");
        assert_eq!(req.template, Template::IntentExtract);
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn agent_task_dispatch_prompt_embeds_params() {
        let req = build_agent_task_dispatch_prompt("summarise uploads", &serde_json::json!({"limit": 5}));
        assert!(req.messages[0].content.contains("limit"));
    }
}
