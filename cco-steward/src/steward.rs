//! IntentSteward: the signal prefilter, clusterer, and layout-plan
//! generator (§4.L).

use std::sync::Arc;

use cco_proto::{
    CoreError, Event, EventLog, EventType, IntentCard, IntentCardId, IntentCardStatus,
    IntentLayoutPlan, IntentLog, IntentLogId, IntentLogPhase, IntentOperation, IntentOperationType,
    IntentPriority, IntentStore, Provider, SignalMappingEntry,
};
use uuid::Uuid;

use crate::heuristic;
use crate::llm;
use crate::types::AnalyzeTurnInput;

const RECENT_MESSAGE_WINDOW: usize = 10;
const SIGNAL_WINDOW_HOURS: i64 = 24;
const MAX_VISIBLE_CARDS: usize = 10;

/// Signal prefilter + clusterer + LLM-assisted layout planner (§4.L).
pub struct IntentSteward {
    provider: Arc<dyn Provider>,
    event_log: Arc<dyn EventLog>,
    intent_store: Arc<dyn IntentStore>,
    chat_model: String,
}

impl IntentSteward {
    /// Build a steward over its three collaborators and a default chat
    /// model, mirroring `IntentPipeline::new`'s constructor shape.
    pub fn new(
        provider: Arc<dyn Provider>,
        event_log: Arc<dyn EventLog>,
        intent_store: Arc<dyn IntentStore>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self { provider, event_log, intent_store, chat_model: chat_model.into() }
    }

    /// Run one IntentSteward pass over a turn (§4.L steps 1-5).
    pub async fn analyze_turn(&self, input: AnalyzeTurnInput) -> Result<IntentLayoutPlan, CoreError> {
        // Step 1: input collection.
        let recent_events = self
            .event_log
            .list(
                &input.workspace_id,
                None,
                Some(&[EventType::Message]),
                None,
                None,
                Some(RECENT_MESSAGE_WINDOW),
                None,
            )
            .await?;
        let recent_messages: Vec<String> = recent_events.iter().map(message_text).collect();

        let candidate_signals = self
            .intent_store
            .recent_candidate_signals(&input.workspace_id, chrono::Duration::hours(SIGNAL_WINDOW_HOURS))
            .await?;
        let visible_cards =
            self.intent_store.list_visible_cards(&input.profile_id, MAX_VISIBLE_CARDS).await?;

        // Step 2: prefilter.
        let survivors = crate::prefilter::prefilter(candidate_signals);

        // Step 3: LLM analysis, falling back to the heuristic clusterer.
        let llm_result =
            llm::build_layout(self.provider.as_ref(), &self.chat_model, &survivors, &visible_cards, &recent_messages)
                .await
                .ok()
                .flatten();

        let (operations, ephemeral, signal_mapping, method) = match llm_result {
            Some(layout) => {
                let signal_mapping = signal_mapping_from_operations(&survivors, &layout.operations);
                (layout.operations, layout.ephemeral, signal_mapping, "llm")
            }
            None => {
                let result = heuristic::cluster(&survivors, &visible_cards);
                (result.operations, result.ephemeral, result.signal_mapping, "heuristic")
            }
        };

        let mut plan = IntentLayoutPlan {
            long_term_intents: operations,
            ephemeral_tasks: ephemeral,
            signal_mapping,
            metadata: serde_json::json!({
                "method": method,
                "survivor_count": survivors.len(),
                "visible_card_count": visible_cards.len(),
            }),
        };

        // Step 4: conditional execution.
        let mut executed_operations = Vec::new();
        if input.auto_intent_layout {
            for op in &plan.long_term_intents {
                match self.execute_operation(&input, op).await {
                    Ok(card_id) => {
                        executed_operations.push(serde_json::json!({
                            "type": op.op_type,
                            "intent_id": card_id.as_str(),
                        }));
                        for entry in plan.signal_mapping.iter_mut() {
                            if op.relation_signals.contains(&entry.signal_id) {
                                entry.target_intent_id = Some(card_id.clone());
                            }
                        }
                        for signal_id in &op.relation_signals {
                            self.intent_store
                                .update_signal_status(signal_id, cco_proto::IntentSignalStatus::Accepted)
                                .await?;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            workspace_id = %input.workspace_id,
                            op_type = ?op.op_type,
                            error = %err,
                            "IntentSteward operation failed to execute"
                        );
                    }
                }
            }
        }

        // Step 5: audit.
        let phase =
            if input.auto_intent_layout { IntentLogPhase::Phase2Execution } else { IntentLogPhase::Phase1Observation };
        let log = IntentLog {
            id: IntentLogId::from(Uuid::new_v4().to_string()),
            workspace_id: input.workspace_id.clone(),
            profile_id: input.profile_id.clone(),
            raw_input: input.conversation_id.clone().unwrap_or_default(),
            channel: "intent_steward".to_string(),
            pipeline_steps: serde_json::json!({
                "survivor_count": survivors.len(),
                "method": method,
            }),
            final_decision: serde_json::json!({
                "create_count": plan.create_count(),
                "update_count": plan.update_count(),
                "executed_operations": executed_operations,
            }),
            user_override: None,
            phase,
            created_at: chrono::Utc::now(),
        };
        self.intent_store.append_log(log).await?;

        Ok(plan)
    }

    async fn execute_operation(
        &self,
        input: &AnalyzeTurnInput,
        op: &IntentOperation,
    ) -> Result<IntentCardId, CoreError> {
        match op.op_type {
            IntentOperationType::CreateIntentCard => {
                let card = IntentCard {
                    id: IntentCardId::from(Uuid::new_v4().to_string()),
                    profile_id: input.profile_id.clone(),
                    title: op.data["title"].as_str().unwrap_or(&op.reasoning).to_string(),
                    description: op.data["description"].as_str().unwrap_or_default().to_string(),
                    status: IntentCardStatus::Active,
                    priority: IntentPriority::Medium,
                    tags: Vec::new(),
                    category: None,
                    progress_percentage: 0,
                    metadata: serde_json::json!({
                        "source": "intent_steward_auto",
                        "workspace_id": input.workspace_id.as_str(),
                        "confidence": op.confidence,
                        "reasoning": op.reasoning,
                        "relation_signals": op.relation_signals.iter().map(|s| s.as_str().to_string()).collect::<Vec<_>>(),
                    }),
                };
                let card_id = card.id.clone();
                self.intent_store.put_card(card).await?;
                Ok(card_id)
            }
            IntentOperationType::UpdateIntentCard => {
                let card_id = op
                    .intent_id
                    .clone()
                    .ok_or_else(|| CoreError::IntegrityError("UPDATE_INTENT_CARD without intent_id".to_string()))?;
                let mut card = self
                    .intent_store
                    .get_card(&card_id)
                    .await?
                    .ok_or_else(|| CoreError::IntegrityError(format!("intent card {card_id} not found")))?;

                let rollback_data = serde_json::json!({
                    "title": card.title,
                    "description": card.description,
                    "priority": card.priority,
                    "status": card.status,
                    "metadata": card.metadata,
                });

                if let Some(title) = op.data["title"].as_str() {
                    card.title = title.to_string();
                }
                if let Some(description) = op.data["description"].as_str() {
                    card.description = description.to_string();
                }
                let mut metadata = card.metadata.clone();
                metadata["rollback_data"] = rollback_data;
                card.metadata = metadata;

                self.intent_store.put_card(card.clone()).await?;
                Ok(card.id)
            }
        }
    }

    /// One-level undo of the most recent UPDATE applied to `intent_id`,
    /// restoring `{title, description, priority, status, metadata}` from
    /// `metadata.rollback_data` and clearing that slot.
    pub async fn rollback(&self, intent_id: &IntentCardId) -> Result<IntentCard, CoreError> {
        let mut card = self
            .intent_store
            .get_card(intent_id)
            .await?
            .ok_or_else(|| CoreError::IntegrityError(format!("intent card {intent_id} not found")))?;

        let rollback_data = card.metadata.get("rollback_data").cloned().ok_or_else(|| {
            CoreError::IntegrityError(format!("intent card {intent_id} has no rollback data"))
        })?;

        if let Some(title) = rollback_data["title"].as_str() {
            card.title = title.to_string();
        }
        if let Some(description) = rollback_data["description"].as_str() {
            card.description = description.to_string();
        }
        if let Some(priority) = rollback_data.get("priority").and_then(|v| serde_json::from_value(v.clone()).ok()) {
            card.priority = priority;
        }
        if let Some(status) = rollback_data.get("status").and_then(|v| serde_json::from_value(v.clone()).ok()) {
            card.status = status;
        }
        if let Some(metadata) = rollback_data.get("metadata").cloned() {
            card.metadata = metadata;
        }

        self.intent_store.put_card(card.clone()).await?;
        Ok(card)
    }
}

fn message_text(event: &Event) -> String {
    event.payload["text"].as_str().map(str::to_string).unwrap_or_else(|| event.payload.to_string())
}

fn signal_mapping_from_operations(
    survivors: &[cco_proto::IntentSignal],
    operations: &[IntentOperation],
) -> Vec<SignalMappingEntry> {
    let mut mapping = Vec::new();
    for op in operations {
        let action = match op.op_type {
            IntentOperationType::CreateIntentCard => "created",
            IntentOperationType::UpdateIntentCard => "updated",
        };
        for signal_id in &op.relation_signals {
            mapping.push(SignalMappingEntry {
                signal_id: signal_id.clone(),
                action: action.to_string(),
                target_intent_id: op.intent_id.clone(),
                reasoning: op.reasoning.clone(),
            });
        }
    }
    let mapped: std::collections::HashSet<_> = mapping.iter().map(|e| e.signal_id.clone()).collect();
    for signal in survivors {
        if !mapped.contains(&signal.id) {
            mapping.push(SignalMappingEntry {
                signal_id: signal.id.clone(),
                action: "ephemeral".to_string(),
                target_intent_id: None,
                reasoning: "not selected by the LLM layout proposal".to_string(),
            });
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cco_proto::{
        ChatCompletion, ChatDelta, ChatMessage, EventId, EventLogError, IntentSignal, IntentSignalId,
        IntentSignalSource, IntentSignalStatus, MessageId, ProfileId, ProviderError, ProviderType,
        ThreadId, WorkspaceId,
    };
    use futures::Stream;
    use std::pin::Pin;
    use std::sync::Mutex;
    use tokio::sync::RwLock;

    struct NoopEventLog;

    #[async_trait]
    impl EventLog for NoopEventLog {
        async fn append(&self, _event: Event) -> Result<EventId, EventLogError> {
            Ok(EventId::from(Uuid::new_v4().to_string()))
        }

        async fn list(
            &self,
            _workspace_id: &WorkspaceId,
            _thread_id: Option<&ThreadId>,
            _types: Option<&[EventType]>,
            _start_time: Option<chrono::DateTime<chrono::Utc>>,
            _end_time: Option<chrono::DateTime<chrono::Utc>>,
            _limit: Option<usize>,
            _before_id: Option<&EventId>,
        ) -> Result<Vec<Event>, EventLogError> {
            Ok(Vec::new())
        }

        async fn count_messages_by_thread(
            &self,
            _workspace_id: &WorkspaceId,
            _thread_id: &ThreadId,
        ) -> Result<u64, EventLogError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct MemoryIntentStoreStub {
        cards: RwLock<std::collections::HashMap<String, IntentCard>>,
        signals: Mutex<Vec<IntentSignal>>,
        logs: Mutex<Vec<IntentLog>>,
    }

    #[async_trait]
    impl IntentStore for MemoryIntentStoreStub {
        async fn put_card(&self, card: IntentCard) -> Result<(), CoreError> {
            self.cards.write().await.insert(card.id.as_str().to_string(), card);
            Ok(())
        }

        async fn get_card(&self, id: &IntentCardId) -> Result<Option<IntentCard>, CoreError> {
            Ok(self.cards.read().await.get(id.as_str()).cloned())
        }

        async fn list_visible_cards(&self, _profile_id: &ProfileId, _limit: usize) -> Result<Vec<IntentCard>, CoreError> {
            Ok(self.cards.read().await.values().cloned().collect())
        }

        async fn put_signal(&self, signal: IntentSignal) -> Result<(), CoreError> {
            self.signals.lock().unwrap().push(signal);
            Ok(())
        }

        async fn recent_candidate_signals(
            &self,
            _workspace_id: &WorkspaceId,
            _window: chrono::Duration,
        ) -> Result<Vec<IntentSignal>, CoreError> {
            Ok(self.signals.lock().unwrap().clone())
        }

        async fn update_signal_status(&self, id: &IntentSignalId, status: IntentSignalStatus) -> Result<(), CoreError> {
            if let Some(signal) = self.signals.lock().unwrap().iter_mut().find(|s| &s.id == id) {
                signal.status = status;
            }
            Ok(())
        }

        async fn append_log(&self, log: IntentLog) -> Result<IntentLogId, CoreError> {
            let id = log.id.clone();
            self.logs.lock().unwrap().push(log);
            Ok(id)
        }
    }

    struct StubProvider {
        response: String,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Anthropic
        }

        async fn chat_completion(
            &self,
            _messages: Vec<ChatMessage>,
            _model: &str,
            _temperature: Option<f32>,
            _max_tokens: Option<u32>,
        ) -> Result<ChatCompletion, ProviderError> {
            Ok(ChatCompletion {
                text: self.response.clone(),
                usage: cco_proto::Usage { input_tokens: 0, output_tokens: 0 },
            })
        }

        async fn chat_completion_stream(
            &self,
            _messages: Vec<ChatMessage>,
            _model: &str,
            _temperature: Option<f32>,
            _max_tokens: Option<u32>,
        ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatDelta, ProviderError>> + Send>>, ProviderError> {
            Err(ProviderError::SamplingNotSupported)
        }
    }

    fn signal(label: &str, confidence: f32) -> IntentSignal {
        IntentSignal {
            id: IntentSignalId::from(format!("sig-{label}")),
            workspace_id: WorkspaceId::from("ws-1"),
            profile_id: ProfileId::from("profile-1"),
            label: label.to_string(),
            confidence,
            source: IntentSignalSource::Rule,
            message_id: Some(MessageId::from("msg-1")),
            status: IntentSignalStatus::Candidate,
        }
    }

    #[tokio::test]
    async fn observation_mode_never_mutates_the_store() {
        let store = Arc::new(MemoryIntentStoreStub::default());
        store.put_signal(signal("launch the product next quarter", 0.9)).await.unwrap();
        store.put_signal(signal("launch the product next quarter push", 0.85)).await.unwrap();

        let provider = Arc::new(StubProvider { response: "not json".to_string() });
        let steward = IntentSteward::new(provider, Arc::new(NoopEventLog), store.clone(), "claude-haiku");

        let plan = steward
            .analyze_turn(AnalyzeTurnInput {
                workspace_id: WorkspaceId::from("ws-1"),
                profile_id: ProfileId::from("profile-1"),
                turn_id: MessageId::from("msg-1"),
                conversation_id: None,
                auto_intent_layout: false,
            })
            .await
            .unwrap();

        assert_eq!(plan.create_count(), 1);
        assert!(store.cards.read().await.is_empty());
    }

    #[tokio::test]
    async fn execution_mode_persists_a_created_card() {
        let store = Arc::new(MemoryIntentStoreStub::default());
        store.put_signal(signal("launch the product next quarter", 0.9)).await.unwrap();
        store.put_signal(signal("launch the product next quarter push", 0.85)).await.unwrap();

        let provider = Arc::new(StubProvider { response: "not json".to_string() });
        let steward = IntentSteward::new(provider, Arc::new(NoopEventLog), store.clone(), "claude-haiku");

        let plan = steward
            .analyze_turn(AnalyzeTurnInput {
                workspace_id: WorkspaceId::from("ws-1"),
                profile_id: ProfileId::from("profile-1"),
                turn_id: MessageId::from("msg-1"),
                conversation_id: None,
                auto_intent_layout: true,
            })
            .await
            .unwrap();

        assert_eq!(plan.create_count(), 1);
        assert_eq!(store.cards.read().await.len(), 1);
    }

    #[tokio::test]
    async fn rollback_restores_the_pre_update_snapshot() {
        let store = Arc::new(MemoryIntentStoreStub::default());
        let card = IntentCard {
            id: IntentCardId::from("card-1"),
            profile_id: ProfileId::from("profile-1"),
            title: "original title".to_string(),
            description: "original description".to_string(),
            status: IntentCardStatus::Active,
            priority: IntentPriority::Medium,
            tags: vec![],
            category: None,
            progress_percentage: 0,
            metadata: serde_json::json!({}),
        };
        store.put_card(card).await.unwrap();

        let provider = Arc::new(StubProvider { response: "not json".to_string() });
        let steward = IntentSteward::new(provider, Arc::new(NoopEventLog), store.clone(), "claude-haiku");

        let op = IntentOperation {
            op_type: IntentOperationType::UpdateIntentCard,
            intent_id: Some(IntentCardId::from("card-1")),
            data: serde_json::json!({"title": "new title", "description": "new description"}),
            relation_signals: vec![],
            confidence: 0.9,
            reasoning: "test".to_string(),
        };
        let input = AnalyzeTurnInput {
            workspace_id: WorkspaceId::from("ws-1"),
            profile_id: ProfileId::from("profile-1"),
            turn_id: MessageId::from("msg-1"),
            conversation_id: None,
            auto_intent_layout: true,
        };
        steward.execute_operation(&input, &op).await.unwrap();
        assert_eq!(store.get_card(&IntentCardId::from("card-1")).await.unwrap().unwrap().title, "new title");

        let restored = steward.rollback(&IntentCardId::from("card-1")).await.unwrap();
        assert_eq!(restored.title, "original title");
        assert_eq!(restored.description, "original description");
    }
}
