//! Event-Hook Runner: `on_chat_synced` (§4.J).

use std::sync::Arc;

use cco_proto::{
    Actor, ConfigSnapshot, CoreError, Event, EventId, EventLog, EventType, HookResults, HookRun,
    HookRunLedger, HookRunStatus, IntentSignal, IntentSignalSource, IntentSignalStatus, IntentStore,
    MessageId, ProfileId, Provider, Receipt, ThreadId, WorkspaceId,
};
use cco_steward::{AnalyzeTurnInput, IntentSteward};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::prompts::build_intent_extract_prompt;
use crate::receipt::{evaluate, find_receipt};
use crate::sampling::SamplingGate;

const INTENT_EXTRACT: &str = "intent_extract";
const STEWARD_ANALYZE: &str = "steward_analyze";

fn idempotency_key(workspace_id: &WorkspaceId, message_id: &MessageId, step: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{workspace_id}:{message_id}:{step}").as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..48].to_string()
}

/// Input to one [`HookRunner::on_chat_synced`] cycle.
pub struct ChatSyncedInput {
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The owning profile.
    pub profile_id: ProfileId,
    /// The raw turn text `intent_extract` analyses.
    pub message: String,
    /// The turn this cycle is scoped to.
    pub message_id: MessageId,
    /// Cross-system correlation id, threaded through emitted events.
    pub trace_id: String,
    /// The thread this turn belongs to, if any.
    pub thread_id: Option<ThreadId>,
    /// Caller-supplied IDE attestations, one per hook step at most.
    pub ide_receipts: Vec<Receipt>,
    /// Resolved workspace-scoped `auto_intent_layout` flag, threaded
    /// straight through to `steward_analyze` (mirrors
    /// `AnalyzeTurnInput::auto_intent_layout`).
    pub auto_intent_layout: bool,
}

/// Runs the fixed `intent_extract` → `steward_analyze` hook pipeline after
/// a turn is durably recorded (§4.J).
pub struct HookRunner {
    provider: Arc<dyn Provider>,
    event_log: Arc<dyn EventLog>,
    intent_store: Arc<dyn IntentStore>,
    ledger: Arc<dyn HookRunLedger>,
    steward: Arc<IntentSteward>,
    sampling_gate: Option<Arc<SamplingGate>>,
    config: ConfigSnapshot,
    chat_model: String,
}

impl HookRunner {
    /// Build a runner over its collaborators. `sampling_gate` is `None` when
    /// no Sampling Gate is configured for this deployment, in which case
    /// `intent_extract`'s body falls straight through to a direct Provider
    /// call (§4.J "Hook body fallback chain").
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        event_log: Arc<dyn EventLog>,
        intent_store: Arc<dyn IntentStore>,
        ledger: Arc<dyn HookRunLedger>,
        steward: Arc<IntentSteward>,
        sampling_gate: Option<Arc<SamplingGate>>,
        config: ConfigSnapshot,
        chat_model: impl Into<String>,
    ) -> Self {
        Self { provider, event_log, intent_store, ledger, steward, sampling_gate, config, chat_model: chat_model.into() }
    }

    /// Run the hook pipeline for one turn (§4.J).
    pub async fn on_chat_synced(&self, input: ChatSyncedInput) -> Result<HookResults, CoreError> {
        let mut results = HookResults::default();

        let intent_decision = evaluate(INTENT_EXTRACT, find_receipt(INTENT_EXTRACT, &input.ide_receipts));
        self.emit_receipt_event(&input, &intent_decision).await?;
        results.receipt_decisions.push(intent_decision.clone());

        let intent_signals = if intent_decision.should_run && self.config.hook_enabled(INTENT_EXTRACT) {
            match self.run_intent_extract(&input).await {
                Some(signals) => {
                    results.triggered_hooks.push(INTENT_EXTRACT.to_string());
                    signals
                }
                None => {
                    results.skipped_hooks.push(INTENT_EXTRACT.to_string());
                    Vec::new()
                }
            }
        } else {
            results.skipped_hooks.push(INTENT_EXTRACT.to_string());
            Vec::new()
        };
        results.intent_tags = if intent_signals.is_empty() { None } else { Some(intent_signals.clone()) };

        let steward_decision = evaluate(STEWARD_ANALYZE, find_receipt(STEWARD_ANALYZE, &input.ide_receipts));
        self.emit_receipt_event(&input, &steward_decision).await?;
        results.receipt_decisions.push(steward_decision.clone());

        let steward_gated = !intent_signals.is_empty() && steward_decision.should_run;
        if steward_gated && self.config.hook_enabled(STEWARD_ANALYZE) {
            match self.run_steward_analyze(&input, &intent_signals).await {
                Some(plan) => {
                    results.triggered_hooks.push(STEWARD_ANALYZE.to_string());
                    results.layout_plan = Some(plan);
                }
                None => results.skipped_hooks.push(STEWARD_ANALYZE.to_string()),
            }
        } else {
            results.skipped_hooks.push(STEWARD_ANALYZE.to_string());
        }

        Ok(results)
    }

    async fn emit_receipt_event(
        &self,
        input: &ChatSyncedInput,
        decision: &cco_proto::ReceiptDecision,
    ) -> Result<(), CoreError> {
        if decision.reason == cco_proto::ReceiptReason::NoReceipt {
            return Ok(());
        }
        let event_type =
            if decision.reason == cco_proto::ReceiptReason::ReceiptAccepted { EventType::ReceiptAccepted } else { EventType::ReceiptRejected };
        let mut event =
            Event::new(EventId::from(Uuid::new_v4().to_string()), chrono::Utc::now(), Actor::System, event_type, input.workspace_id.clone());
        event.thread_id = input.thread_id.clone();
        event.message_id = Some(input.message_id.clone());
        event.payload = serde_json::json!({
            "step": decision.step,
            "reason": decision.reason,
            "receipt_trace_id": decision.receipt_trace_id,
            "receipt_hash_prefix": decision.receipt_output_hash.as_deref().map(|h| &h[..h.len().min(8)]),
        });
        self.event_log.append(event).await?;
        Ok(())
    }

    /// Execute `intent_extract`'s idempotency-guarded body, returning the
    /// persisted (or freshly produced) signal list, or `None` if the hook
    /// was already run-and-failed under this key.
    async fn run_intent_extract(&self, input: &ChatSyncedInput) -> Option<Vec<IntentSignal>> {
        let key = idempotency_key(&input.workspace_id, &input.message_id, INTENT_EXTRACT);
        if let Ok(Some(existing)) = self.ledger.get(&key).await {
            if existing.status == HookRunStatus::Completed {
                return serde_json::from_value(existing.result_summary).ok();
            }
            return None;
        }

        let outcome = self.extract_intent_signals(input).await;
        let (status, result_summary) = match &outcome {
            Some(signals) => (HookRunStatus::Completed, serde_json::to_value(signals).unwrap_or_default()),
            None => (HookRunStatus::Failed, serde_json::json!({"error": "intent_extract body failed"})),
        };
        let run = HookRun {
            idempotency_key: key,
            hook_type: INTENT_EXTRACT.to_string(),
            workspace_id: input.workspace_id.clone(),
            status,
            result_summary,
            created_at: chrono::Utc::now(),
        };
        let _ = self.ledger.insert_if_absent(run).await;
        outcome
    }

    async fn extract_intent_signals(&self, input: &ChatSyncedInput) -> Option<Vec<IntentSignal>> {
        let request = build_intent_extract_prompt(&input.message);
        let redacted_messages: Vec<cco_proto::ChatMessage> = request
            .messages
            .into_iter()
            .map(|m| cco_proto::ChatMessage { role: m.role, content: self.redact(&m.content) })
            .collect();

        let mut messages = vec![cco_proto::ChatMessage::system(request.system_prompt)];
        messages.extend(redacted_messages);

        let completion = match &self.sampling_gate {
            Some(gate) => {
                let provider = self.provider.clone();
                let model = self.chat_model.clone();
                let fallback_messages = messages.clone();
                let max_tokens = request.max_tokens;
                let sampling_fn: crate::sampling::SamplingFuture =
                    Box::pin(async move { Err(cco_proto::SamplingError::NotSupported) });
                let fallback_fn: crate::sampling::SamplingFuture = Box::pin(async move {
                    provider
                        .chat_completion(fallback_messages, &model, None, Some(max_tokens))
                        .await
                        .map(|c| serde_json::Value::String(c.text))
                        .map_err(|e| cco_proto::SamplingError::AllTiersExhausted(e.to_string()))
                });
                let result = gate
                    .with_fallback(&input.workspace_id, request.template, sampling_fn, fallback_fn, None)
                    .await;
                result.data.and_then(|v| v.as_str().map(str::to_string))
            }
            None => self
                .provider
                .chat_completion(messages, &self.chat_model, None, Some(request.max_tokens))
                .await
                .ok()
                .map(|c| c.text),
        }?;

        parse_intent_signals(&completion, input)
    }

    fn redact(&self, prompt: &str) -> String {
        match &self.sampling_gate {
            Some(gate) => gate.redact_prompt(prompt),
            None => crate::redact::redact(prompt),
        }
    }

    async fn run_steward_analyze(&self, input: &ChatSyncedInput, signals: &[IntentSignal]) -> Option<cco_proto::IntentLayoutPlan> {
        let key = idempotency_key(&input.workspace_id, &input.message_id, STEWARD_ANALYZE);
        if let Ok(Some(existing)) = self.ledger.get(&key).await {
            if existing.status == HookRunStatus::Completed {
                return serde_json::from_value(existing.result_summary).ok();
            }
            return None;
        }

        for signal in signals {
            let _ = self.intent_store.put_signal(signal.clone()).await;
        }

        let outcome = self
            .steward
            .analyze_turn(AnalyzeTurnInput {
                workspace_id: input.workspace_id.clone(),
                profile_id: input.profile_id.clone(),
                turn_id: input.message_id.clone(),
                conversation_id: Some(input.trace_id.clone()),
                auto_intent_layout: input.auto_intent_layout,
            })
            .await
            .ok();

        let (status, result_summary) = match &outcome {
            Some(plan) => (HookRunStatus::Completed, serde_json::to_value(plan).unwrap_or_default()),
            None => (HookRunStatus::Failed, serde_json::json!({"error": "steward_analyze body failed"})),
        };
        let run = HookRun {
            idempotency_key: key,
            hook_type: STEWARD_ANALYZE.to_string(),
            workspace_id: input.workspace_id.clone(),
            status,
            result_summary,
            created_at: chrono::Utc::now(),
        };
        let _ = self.ledger.insert_if_absent(run).await;
        outcome
    }
}

fn parse_intent_signals(text: &str, input: &ChatSyncedInput) -> Option<Vec<IntentSignal>> {
    let parsed: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
    let signals = parsed["signals"]
        .as_array()?
        .iter()
        .filter_map(|raw| {
            let label = raw["label"].as_str()?.to_string();
            let confidence = raw["confidence"].as_f64()? as f32;
            Some(IntentSignal {
                id: cco_proto::IntentSignalId::from(Uuid::new_v4().to_string()),
                workspace_id: input.workspace_id.clone(),
                profile_id: input.profile_id.clone(),
                label,
                confidence,
                source: IntentSignalSource::WsHook,
                message_id: Some(input.message_id.clone()),
                status: IntentSignalStatus::Candidate,
            })
        })
        .collect();
    Some(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cco_proto::{
        ChatCompletion, ChatDelta, ChatMessage, EventLogError, IntentCard, IntentCardId, IntentLayoutPlan,
        IntentLog, IntentLogId, ProviderError, ProviderType, Usage,
    };
    use futures::Stream;
    use std::collections::HashMap;
    use std::pin::Pin;
    use std::sync::Mutex;
    use tokio::sync::RwLock as AsyncRwLock;

    struct RecordingEventLog {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventLog for RecordingEventLog {
        async fn append(&self, event: Event) -> Result<EventId, EventLogError> {
            let id = event.id.clone();
            self.events.lock().unwrap().push(event);
            Ok(id)
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

        async fn count_messages_by_thread(&self, _workspace_id: &WorkspaceId, _thread_id: &ThreadId) -> Result<u64, EventLogError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct MemoryIntentStoreStub {
        cards: AsyncRwLock<HashMap<String, IntentCard>>,
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

        async fn recent_candidate_signals(&self, _workspace_id: &WorkspaceId, _window: chrono::Duration) -> Result<Vec<IntentSignal>, CoreError> {
            Ok(self.signals.lock().unwrap().clone())
        }

        async fn update_signal_status(&self, id: &cco_proto::IntentSignalId, status: IntentSignalStatus) -> Result<(), CoreError> {
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

    #[derive(Default)]
    struct MemoryHookRunLedgerStub {
        rows: Mutex<HashMap<String, HookRun>>,
    }

    #[async_trait]
    impl HookRunLedger for MemoryHookRunLedgerStub {
        async fn insert_if_absent(&self, run: HookRun) -> Result<Option<HookRun>, cco_proto::HookError> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.get(&run.idempotency_key) {
                return Ok(Some(existing.clone()));
            }
            rows.insert(run.idempotency_key.clone(), run);
            Ok(None)
        }

        async fn get(&self, idempotency_key: &str) -> Result<Option<HookRun>, cco_proto::HookError> {
            Ok(self.rows.lock().unwrap().get(idempotency_key).cloned())
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
            Ok(ChatCompletion { text: self.response.clone(), usage: Usage { input_tokens: 0, output_tokens: 0 } })
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

    fn runner(response: &str) -> HookRunner {
        let provider: Arc<dyn Provider> = Arc::new(StubProvider { response: response.to_string() });
        let event_log: Arc<dyn EventLog> = Arc::new(RecordingEventLog { events: Mutex::new(Vec::new()) });
        let intent_store: Arc<dyn IntentStore> = Arc::new(MemoryIntentStoreStub::default());
        let ledger: Arc<dyn HookRunLedger> = Arc::new(MemoryHookRunLedgerStub::default());
        let steward = Arc::new(IntentSteward::new(provider.clone(), event_log.clone(), intent_store.clone(), "claude-haiku"));
        HookRunner::new(provider, event_log, intent_store, ledger, steward, None, ConfigSnapshot::default(), "claude-haiku")
    }

    #[tokio::test]
    async fn no_receipt_runs_intent_extract_and_emits_no_receipt_event() {
        let runner = runner(r#"{"signals": [{"label": "launch the product next quarter", "confidence": 0.9}]}"#);
        let results = runner
            .on_chat_synced(ChatSyncedInput {
                workspace_id: WorkspaceId::from("ws-1"),
                profile_id: ProfileId::from("profile-1"),
                message: "I want to launch the product next quarter".to_string(),
                message_id: MessageId::from("msg-1"),
                trace_id: "trace-1".to_string(),
                thread_id: None,
                ide_receipts: Vec::new(),
                auto_intent_layout: false,
            })
            .await
            .unwrap();

        assert!(results.triggered_hooks.contains(&INTENT_EXTRACT.to_string()));
        assert_eq!(results.intent_tags.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepted_receipt_skips_intent_extract() {
        let runner = runner(r#"{"signals": []}"#);
        let receipt = Receipt {
            step: INTENT_EXTRACT.to_string(),
            trace_id: "trace-1".to_string(),
            output_hash: "abc0123456789abc".to_string(),
            completed_at: Some(chrono::Utc::now() - chrono::Duration::minutes(1)),
        };
        let results = runner
            .on_chat_synced(ChatSyncedInput {
                workspace_id: WorkspaceId::from("ws-1"),
                profile_id: ProfileId::from("profile-1"),
                message: "hello".to_string(),
                message_id: MessageId::from("msg-1"),
                trace_id: "trace-1".to_string(),
                thread_id: None,
                ide_receipts: vec![receipt],
                auto_intent_layout: false,
            })
            .await
            .unwrap();

        assert!(results.skipped_hooks.contains(&INTENT_EXTRACT.to_string()));
        assert!(results.intent_tags.is_none());
    }

    #[tokio::test]
    async fn empty_signal_list_gates_steward_analyze_off() {
        let runner = runner(r#"{"signals": []}"#);
        let results = runner
            .on_chat_synced(ChatSyncedInput {
                workspace_id: WorkspaceId::from("ws-1"),
                profile_id: ProfileId::from("profile-1"),
                message: "hello".to_string(),
                message_id: MessageId::from("msg-1"),
                trace_id: "trace-1".to_string(),
                thread_id: None,
                ide_receipts: Vec::new(),
                auto_intent_layout: false,
            })
            .await
            .unwrap();

        assert!(results.skipped_hooks.contains(&STEWARD_ANALYZE.to_string()));
        assert!(results.layout_plan.is_none());
    }

    #[tokio::test]
    async fn idempotency_key_is_stable_and_scoped_per_step() {
        let workspace_id = WorkspaceId::from("ws-1");
        let message_id = MessageId::from("msg-1");
        let a = idempotency_key(&workspace_id, &message_id, INTENT_EXTRACT);
        let b = idempotency_key(&workspace_id, &message_id, INTENT_EXTRACT);
        let c = idempotency_key(&workspace_id, &message_id, STEWARD_ANALYZE);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 48);
    }
}
