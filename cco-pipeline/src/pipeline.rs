//! The three-layer Intent Pipeline coordinator (§4.F).

use std::sync::Arc;

use cco_proto::{CoreError, IntentLog, IntentLogId, IntentLogPhase, IntentStore, PlaybookRegistry, Provider};

use crate::llm;
use crate::rules::{self, RULE_HIT_CONFIDENCE};
use crate::types::{
    ArbitrationPolicy, DecisionMethod, InteractionType, LayerDecision, PipelineInput,
    PipelineResult, TaskDomain,
};

/// Coordinates the three classification layers, arbitrates rule vs. LLM
/// matchers per [`ArbitrationPolicy`], and writes the decision log.
pub struct IntentPipeline {
    provider: Arc<dyn Provider>,
    playbook_registry: Arc<dyn PlaybookRegistry>,
    intent_store: Arc<dyn IntentStore>,
    chat_model: String,
}

impl IntentPipeline {
    /// Build a pipeline over the given collaborators.
    pub fn new(
        provider: Arc<dyn Provider>,
        playbook_registry: Arc<dyn PlaybookRegistry>,
        intent_store: Arc<dyn IntentStore>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self { provider, playbook_registry, intent_store, chat_model: chat_model.into() }
    }

    /// Run one analysis and persist its [`IntentLog`] (§4.F "decision log:
    /// every analysis... writes an IntentLog").
    pub async fn analyze(&self, input: PipelineInput) -> Result<PipelineResult, CoreError> {
        let layer1 = self.run_layer1(&input).await;

        let layer2 = if layer1.value == InteractionType::StartPlaybook.as_str() {
            Some(self.run_layer2(&input).await)
        } else {
            None
        };

        let (selected_playbook_code, playbook_confidence) = if layer1.value
            == InteractionType::StartPlaybook.as_str()
            && input.policy.use_llm
        {
            self.run_layer3(&input).await
        } else {
            (None, 0.0)
        };

        let handoff_plan = match (&selected_playbook_code, input.policy.use_llm) {
            (Some(code), true) => llm::detect_multi_step(self.provider.as_ref(), &self.chat_model, &input.raw_input, code).await,
            _ => None,
        };

        let pipeline_steps = serde_json::json!({
            "layer1_interaction_type": layer_decision_json(&layer1),
            "layer2_task_domain": layer2.as_ref().map(layer_decision_json),
            "layer3_selected_playbook_code": selected_playbook_code,
            "layer3_confidence": playbook_confidence,
            "multi_step": handoff_plan.is_some(),
        });

        let final_decision = serde_json::json!({
            "interaction_type": layer1.value,
            "task_domain": layer2.as_ref().map(|d| d.value.clone()),
            "selected_playbook_code": selected_playbook_code,
            "method": layer1.method.as_str(),
            "confidence": layer1.confidence,
        });

        let log = IntentLog {
            id: IntentLogId::from(uuid::Uuid::new_v4().to_string()),
            workspace_id: input.workspace_id.clone(),
            profile_id: input.profile_id.clone(),
            raw_input: input.raw_input.clone(),
            channel: input.channel.clone(),
            pipeline_steps: pipeline_steps.clone(),
            final_decision: final_decision.clone(),
            user_override: None,
            phase: IntentLogPhase::Pipeline,
            created_at: chrono::Utc::now(),
        };
        self.intent_store.append_log(log).await?;

        Ok(PipelineResult {
            interaction_type: layer1,
            task_domain: layer2,
            selected_playbook_code,
            playbook_confidence,
            handoff_plan,
            pipeline_steps,
            final_decision,
        })
    }

    async fn run_layer1(&self, input: &PipelineInput) -> LayerDecision {
        let rule_hit = rules::match_interaction_type(&input.channel, &input.raw_input);
        let policy: ArbitrationPolicy = input.policy;

        let (interaction_type, method, confidence) = if policy.rule_priority && rule_hit.is_some() {
            (rule_hit.unwrap(), DecisionMethod::RuleBased, RULE_HIT_CONFIDENCE)
        } else if policy.use_llm {
            match llm::classify_interaction_type(self.provider.as_ref(), &self.chat_model, &input.raw_input).await {
                Ok((it, conf)) => (it, DecisionMethod::LlmBased, conf),
                Err(e) => {
                    tracing::warn!(error = %e, "layer 1 LLM matcher failed, falling back to rule hit");
                    match rule_hit {
                        Some(it) => (it, DecisionMethod::RuleBasedFallback, RULE_HIT_CONFIDENCE),
                        None => (InteractionType::Unknown, DecisionMethod::None, 0.0),
                    }
                }
            }
        } else if let Some(it) = rule_hit {
            (it, DecisionMethod::RuleBased, RULE_HIT_CONFIDENCE)
        } else {
            (InteractionType::Unknown, DecisionMethod::None, 0.0)
        };

        LayerDecision { value: interaction_type.as_str().to_string(), method, confidence }
    }

    async fn run_layer2(&self, input: &PipelineInput) -> LayerDecision {
        if !input.policy.use_llm {
            return LayerDecision { value: TaskDomain::Unknown.as_str().to_string(), method: DecisionMethod::None, confidence: 0.0 };
        }

        let examples: Vec<String> = self
            .intent_store
            .list_visible_cards(&input.profile_id, 5)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.title)
            .collect();

        match llm::classify_task_domain(self.provider.as_ref(), &self.chat_model, &input.raw_input, &examples).await {
            Ok((domain, confidence)) => {
                LayerDecision { value: domain.as_str().to_string(), method: DecisionMethod::LlmBased, confidence }
            }
            Err(e) => {
                tracing::warn!(error = %e, "layer 2 LLM matcher failed");
                LayerDecision { value: TaskDomain::Unknown.as_str().to_string(), method: DecisionMethod::None, confidence: 0.0 }
            }
        }
    }

    async fn run_layer3(&self, input: &PipelineInput) -> (Option<String>, f32) {
        let candidates = match self.playbook_registry.list(&input.workspace_id, &input.locale, None).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "layer 3 could not list effective playbooks");
                return (None, 0.0);
            }
        };

        match llm::select_playbook(self.provider.as_ref(), &self.chat_model, &input.raw_input, &candidates).await {
            Ok(Some(code)) => (Some(code), llm::PLAYBOOK_PICK_CONFIDENCE),
            Ok(None) => (None, 0.0),
            Err(e) => {
                tracing::warn!(error = %e, "layer 3 LLM matcher failed");
                (None, 0.0)
            }
        }
    }
}

fn layer_decision_json(d: &LayerDecision) -> serde_json::Value {
    serde_json::json!({ "value": d.value, "method": d.method.as_str(), "confidence": d.confidence })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cco_proto::{
        ChatCompletion, ChatMessage, CoreError, IntentCard, IntentCardId, IntentLog, IntentLogId,
        IntentSignal, IntentSignalId, IntentSignalStatus, IntentStore, PlaybookMetadata,
        PlaybookRegistryError, PlaybookSource, ProfileId, ProviderError, ProviderType, Usage,
        WorkspaceId,
    };
    use std::pin::Pin;

    #[derive(Default)]
    struct NoopIntentStore;

    #[async_trait]
    impl IntentStore for NoopIntentStore {
        async fn put_card(&self, _card: IntentCard) -> Result<(), CoreError> {
            Ok(())
        }

        async fn get_card(&self, _id: &IntentCardId) -> Result<Option<IntentCard>, CoreError> {
            Ok(None)
        }

        async fn list_visible_cards(
            &self,
            _profile_id: &ProfileId,
            _limit: usize,
        ) -> Result<Vec<IntentCard>, CoreError> {
            Ok(vec![])
        }

        async fn put_signal(&self, _signal: IntentSignal) -> Result<(), CoreError> {
            Ok(())
        }

        async fn recent_candidate_signals(
            &self,
            _workspace_id: &WorkspaceId,
            _window: chrono::Duration,
        ) -> Result<Vec<IntentSignal>, CoreError> {
            Ok(vec![])
        }

        async fn update_signal_status(
            &self,
            _id: &IntentSignalId,
            _status: IntentSignalStatus,
        ) -> Result<(), CoreError> {
            Ok(())
        }

        async fn append_log(&self, _log: IntentLog) -> Result<IntentLogId, CoreError> {
            Ok(IntentLogId::from("log-1"))
        }
    }

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
        ) -> Result<
            Pin<Box<dyn futures::Stream<Item = Result<cco_proto::ChatDelta, ProviderError>> + Send>>,
            ProviderError,
        > {
            Err(ProviderError::SamplingNotSupported)
        }
    }

    struct EmptyPlaybookRegistry;

    #[async_trait]
    impl PlaybookRegistry for EmptyPlaybookRegistry {
        async fn list(
            &self,
            _workspace_id: &WorkspaceId,
            _locale: &str,
            _source: Option<PlaybookSource>,
        ) -> Result<Vec<PlaybookMetadata>, PlaybookRegistryError> {
            Ok(vec![])
        }

        async fn get(
            &self,
            _playbook_code: &str,
            _locale: &str,
            _workspace_id: &WorkspaceId,
        ) -> Result<Option<cco_proto::Playbook>, PlaybookRegistryError> {
            Ok(None)
        }

        async fn load_run(
            &self,
            _playbook_code: &str,
            _locale: &str,
            _workspace_id: &WorkspaceId,
        ) -> Result<Option<cco_proto::PlaybookRun>, PlaybookRegistryError> {
            Ok(None)
        }

        async fn register(
            &self,
            _playbook: cco_proto::Playbook,
            _source: PlaybookSource,
        ) -> Result<(), PlaybookRegistryError> {
            Ok(())
        }
    }

    fn sample_input(raw_input: &str, channel: &str) -> PipelineInput {
        PipelineInput {
            raw_input: raw_input.to_string(),
            channel: channel.to_string(),
            workspace_id: WorkspaceId::from("ws-1"),
            profile_id: ProfileId::from("profile-1"),
            message_id: cco_proto::MessageId::from("msg-1"),
            locale: "en".to_string(),
            policy: ArbitrationPolicy::default(),
        }
    }

    #[tokio::test]
    async fn rule_priority_short_circuits_llm_for_an_obvious_settings_request() {
        let pipeline = IntentPipeline::new(
            Arc::new(StubProvider { reply: "should_never_be_used".into() }),
            Arc::new(EmptyPlaybookRegistry),
            Arc::new(NoopIntentStore::default()),
            "test-model",
        );
        let result = pipeline
            .analyze(sample_input("please change my settings", "api"))
            .await
            .unwrap();
        assert_eq!(result.interaction_type.value, "manage_settings");
        assert_eq!(result.interaction_type.method.as_str(), "rule_based");
    }

    #[tokio::test]
    async fn no_rule_hit_falls_through_to_llm() {
        let pipeline = IntentPipeline::new(
            Arc::new(StubProvider { reply: "qa|0.99".into() }),
            Arc::new(EmptyPlaybookRegistry),
            Arc::new(NoopIntentStore::default()),
            "test-model",
        );
        let result = pipeline.analyze(sample_input("what time is it", "api")).await.unwrap();
        assert_eq!(result.interaction_type.value, "qa");
        assert_eq!(result.interaction_type.method.as_str(), "llm_based");
        assert!((result.interaction_type.confidence - 0.99).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn no_candidates_means_no_playbook_selected() {
        let pipeline = IntentPipeline::new(
            Arc::new(StubProvider { reply: "start_playbook|0.9".into() }),
            Arc::new(EmptyPlaybookRegistry),
            Arc::new(NoopIntentStore::default()),
            "test-model",
        );
        let result =
            pipeline.analyze(sample_input("help me write a proposal", "api")).await.unwrap();
        assert_eq!(result.interaction_type.value, "start_playbook");
        assert!(result.selected_playbook_code.is_none());
    }
}
