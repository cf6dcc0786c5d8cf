//! Test-only wiring shared by this crate's unit tests: a canned [`Provider`]
//! and a fully in-memory [`ConversationOrchestrator`], built the same way a
//! real deployment wires one but over `cco-store-memory`/`cco-playbook`
//! rather than durable backends.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use cco_proto::{
    ChatCompletion, ChatDelta, ChatMessage, ConfigSnapshot, ProfileId, Provider, ProviderError,
    ProviderType, Usage, WorkspaceId,
};
use cco_store_memory::{
    MemoryEventLog, MemoryIntentStore, MemoryTaskStore, MemoryTimelineStore,
};
use futures::Stream;

use crate::identity::LocalIdentityPort;
use crate::intent_registry::LexiconIntentRegistryPort;
use crate::orchestrator::ConversationOrchestrator;
use crate::types::{RouteInput, RouteMode};

/// Canned, deterministic [`Provider`] good enough to drive a turn end to end
/// without a network call. Never streams natively, so callers exercise the
/// Streaming Executor's chunked-fallback path (§4.I "provider dispatch").
pub struct EchoProvider;

#[async_trait]
impl Provider for EchoProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Other
    }

    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        _model: &str,
        _temperature: Option<f32>,
        _max_tokens: Option<u32>,
    ) -> Result<ChatCompletion, ProviderError> {
        let last_user = messages.iter().rev().find(|m| matches!(m.role, cco_proto::ChatRole::User));
        let text = match last_user {
            Some(m) => format!("Echo: {}", m.content),
            None => "Echo: (no input)".to_string(),
        };
        let usage = Usage { input_tokens: 10, output_tokens: text.len() as u32 / 4 };
        Ok(ChatCompletion { text, usage })
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

/// Build a fully in-memory orchestrator over [`EchoProvider`], used by this
/// crate's own unit tests.
pub fn build_test_orchestrator() -> ConversationOrchestrator {
    ConversationOrchestrator::new(
        Arc::new(MemoryEventLog::new()),
        Arc::new(MemoryTaskStore::new()),
        Arc::new(MemoryTimelineStore::new()),
        Arc::new(cco_playbook::MemoryPlaybookRegistry::new()),
        Arc::new(MemoryIntentStore::new()),
        Arc::new(EchoProvider),
        Arc::new(LocalIdentityPort::new()),
        Arc::new(LexiconIntentRegistryPort::new()),
        ConfigSnapshot::default(),
    )
}

/// A minimal, conversational-only [`RouteInput`] good enough to exercise the
/// QA fallback path end to end.
pub fn sample_route_input() -> RouteInput {
    RouteInput {
        workspace_id: WorkspaceId::from("ws-test"),
        profile_id: ProfileId::from("profile-test"),
        message: "what's on my plate today?".to_string(),
        files: Vec::new(),
        mode: RouteMode::Execution,
        project_id: None,
        thread_id: None,
        channel: "api".to_string(),
        locale: "en".to_string(),
        use_llm: false,
        auto_intent_layout: false,
        expected_artifacts: Vec::new(),
    }
}
