//! The Plan Builder: structured LLM plan with a deterministic fallback
//! (§4.G).

use cco_proto::{CoreError, ExecutionPlan, PlanId, PlanStep, Provider, TaskPlan};

use crate::rules;
use crate::types::PlanBuilderInput;

/// Builds one [`ExecutionPlan`] per turn.
pub struct PlanBuilder<'a> {
    provider: &'a dyn Provider,
    model: String,
}

impl<'a> PlanBuilder<'a> {
    /// Build over the given Provider, using `model` for any LLM call.
    pub fn new(provider: &'a dyn Provider, model: impl Into<String>) -> Self {
        Self { provider, model: model.into() }
    }

    /// Produce an [`ExecutionPlan`] for one turn (§4.G).
    ///
    /// Tries the LLM path first when `input.use_llm` is set; any transport
    /// or parse failure, or `use_llm = false`, falls through to the
    /// deterministic rule-based planner, which may legitimately return zero
    /// tasks.
    pub async fn build(&self, input: PlanBuilderInput) -> Result<ExecutionPlan, CoreError> {
        let (steps, tasks, ai_team_members, plan_summary, user_request_summary) = if input.use_llm {
            match crate::llm::build_plan(self.provider, &self.model, &input).await {
                Ok(plan) => (
                    steps_from_json(&plan.steps),
                    plan.tasks,
                    plan.ai_team_members,
                    plan.plan_summary,
                    plan.user_request_summary,
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "plan builder LLM path failed, falling back to rule-based planner");
                    self.fallback_plan(&input)
                }
            }
        } else {
            self.fallback_plan(&input)
        };

        let tasks = apply_side_effect_defaults(tasks);

        Ok(ExecutionPlan {
            id: PlanId::from(uuid::Uuid::new_v4().to_string()),
            workspace_id: input.workspace_id,
            message_id: input.message_id,
            steps,
            tasks,
            ai_team_members,
            plan_summary,
            user_request_summary,
            project_id: input.project_id,
            project_assignment_decision: None,
        })
    }

    fn fallback_plan(
        &self,
        input: &PlanBuilderInput,
    ) -> (Vec<PlanStep>, Vec<TaskPlan>, Vec<String>, String, String) {
        let tasks = rules::build_fallback_tasks(input);
        let steps = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| PlanStep {
                step_id: format!("step-{i}"),
                pack_id: t.pack_id.clone(),
                goal: format!("Run {}", t.task_type),
                input_template: t.params.clone(),
            })
            .collect();

        let plan_summary = if tasks.is_empty() {
            "No action needed for this turn.".to_string()
        } else {
            format!("Dispatching {} task(s) via the deterministic fallback planner.", tasks.len())
        };

        (steps, tasks, Vec::new(), plan_summary, input.message.clone())
    }
}

fn steps_from_json(raw: &[serde_json::Value]) -> Vec<PlanStep> {
    raw.iter()
        .enumerate()
        .map(|(i, s)| PlanStep {
            step_id: s["step_id"].as_str().map(String::from).unwrap_or_else(|| format!("step-{i}")),
            pack_id: s["pack_id"].as_str().unwrap_or_default().to_string(),
            goal: s["goal"].as_str().unwrap_or_default().to_string(),
            input_template: s.get("input_template").cloned().unwrap_or(serde_json::Value::Null),
        })
        .collect()
}

/// Every task inherits `auto_execute = (level == readonly)` and
/// `requires_cta = (level != readonly)` unless it already set one
/// explicitly (§4.G step 3).
fn apply_side_effect_defaults(tasks: Vec<TaskPlan>) -> Vec<TaskPlan> {
    tasks
        .into_iter()
        .map(|mut t| {
            let (auto_execute, requires_cta) = cco_proto::Task::defaults_for(t.side_effect_level);
            t.auto_execute = Some(t.auto_execute.unwrap_or(auto_execute));
            t.requires_cta = Some(t.requires_cta.unwrap_or(requires_cta));
            t
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cco_proto::{
        ChatCompletion, ChatDelta, ChatMessage, MessageId, ProfileId, ProviderError, ProviderType,
        SideEffectLevel, Usage, WorkspaceId,
    };
    use std::pin::Pin;

    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Other
        }

        async fn chat_completion(
            &self,
            _messages: Vec<ChatMessage>,
            _model: &str,
            _temperature: Option<f32>,
            _max_tokens: Option<u32>,
        ) -> Result<ChatCompletion, ProviderError> {
            Ok(ChatCompletion { text: self.reply.clone(), usage: Usage::default() })
        }

        async fn chat_completion_stream(
            &self,
            _messages: Vec<ChatMessage>,
            _model: &str,
            _temperature: Option<f32>,
            _max_tokens: Option<u32>,
        ) -> Result<Pin<Box<dyn futures::Stream<Item = Result<ChatDelta, ProviderError>> + Send>>, ProviderError>
        {
            Err(ProviderError::SamplingNotSupported)
        }
    }

    fn sample_input(use_llm: bool) -> PlanBuilderInput {
        PlanBuilderInput {
            message: "help me write a proposal".into(),
            files: vec![],
            workspace_id: WorkspaceId::from("ws-1"),
            profile_id: ProfileId::from("profile-1"),
            message_id: MessageId::from("msg-1"),
            use_llm,
            project_id: None,
            effective_playbooks: vec![],
            expected_artifacts: vec![],
        }
    }

    #[tokio::test]
    async fn use_llm_false_goes_straight_to_fallback() {
        let provider = StubProvider { reply: "should not be called".into() };
        let builder = PlanBuilder::new(&provider, "test-model");
        let plan = builder.build(sample_input(false)).await.unwrap();
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.plan_summary, "No action needed for this turn.");
    }

    #[tokio::test]
    async fn malformed_llm_response_falls_back() {
        let provider = StubProvider { reply: "not json at all".into() };
        let builder = PlanBuilder::new(&provider, "test-model");
        let plan = builder.build(sample_input(true)).await.unwrap();
        assert!(plan.tasks.is_empty());
    }

    #[tokio::test]
    async fn readonly_task_gets_auto_execute_default() {
        let raw = serde_json::json!({
            "steps": [],
            "tasks": [{"pack_id": "file_analysis", "task_type": "scan", "side_effect_level": "readonly"}],
            "ai_team_members": [],
            "plan_summary": "scan files",
            "user_request_summary": "scan files",
        });
        let provider = StubProvider { reply: raw.to_string() };
        let builder = PlanBuilder::new(&provider, "test-model");
        let plan = builder.build(sample_input(true)).await.unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].side_effect_level, SideEffectLevel::Readonly);
        assert_eq!(plan.tasks[0].auto_execute, Some(true));
        assert_eq!(plan.tasks[0].requires_cta, Some(false));
    }
}
