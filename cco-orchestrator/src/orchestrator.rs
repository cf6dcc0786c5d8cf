//! The Conversation Orchestrator: the top-level `route()` router (§4.H).

use std::sync::Arc;

use cco_pipeline::{ArbitrationPolicy, IntentPipeline, PipelineInput};
use cco_plan::{PlanBuilder, PlanBuilderInput, PlanInputFile};
use cco_proto::{
    Actor, ChatMessage, CoreError, Event, EventId, EventLog, EventType, IdentityPort, IntentRegistryPort,
    IntentStore, OrchestratorError, Playbook, PlaybookRegistry, Provider, Task, TaskId, TaskStatus,
    TaskStore, ThreadId, TimelineItem, TimelineItemId, TimelineItemType, TimelineStore,
};
use cco_steward::{AnalyzeTurnInput, IntentSteward};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::cancel::CancellationSignal;
use crate::context::{build_context, ContextSection};
use crate::events::{EventSink, NullSink, PipelineStageKind, StreamEvent, TaskUpdateKind};
use crate::project;
use crate::types::{NormalizedFile, RouteInput, RouteInputFile, RouteMode, RouteOutcome};

/// Top-level router over the Event Log, Task Store, Timeline Store,
/// Playbook Registry, Intent Store, Provider, and the two pluggable identity
/// ports. Wires `cco-pipeline` and `cco-plan` internally; does not depend on
/// `cco-hooks`, since the Event-Hook Runner (§4.J) is a separate top-level
/// entrypoint triggered by an IDE's own chat-sync flow rather than a
/// sub-step of `route()`.
pub struct ConversationOrchestrator {
    pub(crate) event_log: Arc<dyn EventLog>,
    task_store: Arc<dyn TaskStore>,
    timeline_store: Arc<dyn TimelineStore>,
    playbook_registry: Arc<dyn PlaybookRegistry>,
    pub(crate) provider: Arc<dyn Provider>,
    identity_port: Arc<dyn IdentityPort>,
    intent_registry_port: Arc<dyn IntentRegistryPort>,
    pub(crate) config: cco_proto::ConfigSnapshot,
    pipeline: IntentPipeline,
    steward: IntentSteward,
}

impl ConversationOrchestrator {
    /// Build an orchestrator over its collaborators, constructing its own
    /// internal [`IntentPipeline`] and [`IntentSteward`] the same way a
    /// top-level wiring module would.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_log: Arc<dyn EventLog>,
        task_store: Arc<dyn TaskStore>,
        timeline_store: Arc<dyn TimelineStore>,
        playbook_registry: Arc<dyn PlaybookRegistry>,
        intent_store: Arc<dyn IntentStore>,
        provider: Arc<dyn Provider>,
        identity_port: Arc<dyn IdentityPort>,
        intent_registry_port: Arc<dyn IntentRegistryPort>,
        config: cco_proto::ConfigSnapshot,
    ) -> Self {
        let pipeline = IntentPipeline::new(
            provider.clone(),
            playbook_registry.clone(),
            intent_store.clone(),
            config.chat_model.clone(),
        );
        let steward = IntentSteward::new(provider.clone(), event_log.clone(), intent_store, config.chat_model.clone());
        Self {
            event_log,
            task_store,
            timeline_store,
            playbook_registry,
            provider,
            identity_port,
            intent_registry_port,
            config,
            pipeline,
            steward,
        }
    }

    /// Run the full 12-step route for one turn (§4.H), discarding
    /// stage-by-stage progress events. Callers that want the incremental SSE
    /// sequence use [`crate::streaming::StreamingExecutor`] instead, which
    /// drives [`ConversationOrchestrator::route_with_sink`] directly.
    pub async fn route(&self, input: RouteInput) -> Result<RouteOutcome, CoreError> {
        self.route_with_sink(input, &NullSink, None).await
    }

    /// The full 12-step route, emitting a [`StreamEvent`] at every named
    /// stage boundary from §4.I's table so [`crate::streaming::StreamingExecutor`]
    /// and [`ConversationOrchestrator::route`] share one implementation.
    ///
    /// `cancel`, when supplied, is checked (non-blocking) before every
    /// suspension point that follows the durable USER event append (§5
    /// "cancel before every suspension point"): the Intent Pipeline's own
    /// Provider call, the Plan Builder's Provider call, and the QA
    /// fallback's Provider call. A cancellation observed at one of these
    /// checkpoints skips the remaining steps and marks any task rows
    /// already created `Pending` as `Skipped`, since they have not yet
    /// transitioned to `running` (§5 "tasks that have not yet transitioned
    /// to running become skipped").
    pub async fn route_with_sink(
        &self,
        input: RouteInput,
        sink: &dyn EventSink,
        cancel: Option<&CancellationSignal>,
    ) -> Result<RouteOutcome, CoreError> {
        let run_id = cco_proto::RunId::new(Uuid::new_v4().to_string());
        let message_id = cco_proto::MessageId::new(Uuid::new_v4().to_string());
        let thread_id = input.thread_id.clone().map(ThreadId::from);

        let recent_events = self
            .event_log
            .list(&input.workspace_id, thread_id.as_ref(), None, None, None, Some(50), None)
            .await?;

        // Step 1: file normalisation. Missing ids are reported, not fatal.
        let normalized_files = normalize_files(&input.files, &recent_events);
        for file in &normalized_files {
            if file.file_document_id.is_none() {
                tracing::warn!(file_id = %file.input.id, "could not resolve file id to a recent event");
            }
        }

        // Step 3: project assignment. Computed ahead of the USER event
        // append below: the Event Log has no update path (§4.A is strictly
        // append-only), so "annotate the USER event's metadata" is realised
        // by folding this decision into that event's `metadata` at the one
        // point it is written, rather than mutating it afterwards.
        let project_decision = project::assign_project(
            input.project_id.clone(),
            &recent_events,
            input.use_llm,
            Some(self.provider.as_ref()),
            &self.config.chat_model,
        )
        .await;

        // Step 4: identity context.
        let identity_ctx = self
            .identity_port
            .get_current_context(Some(&input.workspace_id), Some(&input.profile_id))
            .await;

        // Step 5: effective playbook resolution.
        let effective_playbooks =
            self.playbook_registry.list(&input.workspace_id, &input.locale, None).await?;

        // Step 6: intent extraction (pre-pipeline), non-blocking on failure.
        sink.emit(StreamEvent::PipelineStage {
            run_id: run_id.clone(),
            stage: PipelineStageKind::IntentExtraction,
            message: "resolving intents and themes from the turn".to_string(),
            metadata: None,
        });
        let resolved_intent = self
            .intent_registry_port
            .resolve_intent(&input.message, &identity_ctx, None, Some(&input.locale))
            .await;

        // Step 2: USER event append (durable; failure is fatal), carrying
        // steps 3 and 6's derived metadata.
        let mut user_event = Event::new(
            EventId::new(Uuid::new_v4().to_string()),
            Utc::now(),
            Actor::User,
            EventType::Message,
            input.workspace_id.clone(),
        );
        user_event.thread_id = thread_id.clone();
        user_event.profile_id = Some(input.profile_id.clone());
        user_event.message_id = Some(message_id.clone());
        user_event.project_id = project_decision.project_id.clone();
        user_event.payload = json!({
            "text": input.message,
            "files": normalized_files.iter().map(|f| json!({
                "id": f.input.id,
                "mime_type": f.input.mime_type,
                "file_document_id": f.file_document_id,
            })).collect::<Vec<_>>(),
        });
        user_event.metadata = json!({
            "project_assignment": {
                "project_id": project_decision.project_id.as_ref().map(|p| p.as_str()),
                "relation": project_decision.relation,
                "confidence": project_decision.confidence,
                "requires_ui_confirmation": project_decision.requires_ui_confirmation,
            },
            "intents": resolved_intent.intents,
            "themes": resolved_intent.themes,
            "intent_confidence": resolved_intent.confidence,
        });
        let user_event_id = self
            .event_log
            .append(user_event)
            .await
            .map_err(OrchestratorError::UserEventAppendFailed)?;
        sink.emit(StreamEvent::UserMessage { event_id: user_event_id });

        let mut display_events = Vec::new();

        // Intent-seeds timeline card (§4.H step 6).
        let intent_seed_item = TimelineItem {
            id: TimelineItemId::new(Uuid::new_v4().to_string()),
            workspace_id: input.workspace_id.clone(),
            message_id: message_id.clone(),
            task_id: None,
            item_type: TimelineItemType::IntentSeeds,
            title: "Intent seeds".to_string(),
            summary: if resolved_intent.intents.is_empty() {
                "No intents detected for this turn.".to_string()
            } else {
                format!("Detected: {}", resolved_intent.intents.join(", "))
            },
            data: json!({
                "intents": resolved_intent.intents,
                "themes": resolved_intent.themes,
                "confidence": resolved_intent.confidence,
            }),
            cta: None,
            created_at: Utc::now(),
        };
        if let Err(e) = self.timeline_store.create(intent_seed_item.clone()).await {
            tracing::warn!(error = %e, "failed to record intent-seed timeline item");
        }
        display_events.push(intent_seed_item);

        if is_cancelled(cancel) {
            return Ok(cancelled_outcome(input.workspace_id, user_event_id, display_events));
        }

        // Step 7: Intent Pipeline. Non-fatal: a failure here falls through
        // to the QA path exactly as if no playbook had been selected.
        let pipeline_input = PipelineInput {
            raw_input: input.message.clone(),
            channel: input.channel.clone(),
            workspace_id: input.workspace_id.clone(),
            profile_id: input.profile_id.clone(),
            message_id: message_id.clone(),
            locale: input.locale.clone(),
            policy: ArbitrationPolicy { use_llm: input.use_llm, rule_priority: true },
        };
        let pipeline_result = match self.pipeline.analyze(pipeline_input).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, "intent pipeline failed, falling back to QA");
                sink.emit(StreamEvent::PipelineStage {
                    run_id: run_id.clone(),
                    stage: PipelineStageKind::ExecutionError,
                    message: format!("intent pipeline failed: {e}"),
                    metadata: Some(json!({ "error_type": "intent_pipeline", "error_message": e.to_string() })),
                });
                None
            }
        };
        sink.emit(StreamEvent::PipelineStage {
            run_id: run_id.clone(),
            stage: PipelineStageKind::PlaybookSelection,
            message: pipeline_result
                .as_ref()
                .and_then(|r| r.selected_playbook_code.clone())
                .unwrap_or_else(|| "no playbook selected".to_string()),
            metadata: None,
        });

        // Step 8: multi-step detection branch. The Workflow Orchestrator
        // itself is an external collaborator outside this crate's boundary
        // (§4.H step 8); this implementation summarises the handoff into an
        // ASSISTANT event rather than invoking an orchestrator that does not
        // exist in this workspace.
        if let Some(handoff) = pipeline_result.as_ref().and_then(|r| r.handoff_plan.as_ref()) {
            let summary = summarize_handoff(handoff);
            self.append_assistant_event(&input.workspace_id, thread_id.as_ref(), &message_id, &summary)
                .await?;
            return Ok(RouteOutcome {
                workspace_id: input.workspace_id,
                user_event_id,
                display_events,
                triggered_playbook: None,
                pending_tasks: Vec::new(),
                context_tokens: 0,
            });
        }

        if is_cancelled(cancel) {
            return Ok(cancelled_outcome(input.workspace_id, user_event_id, display_events));
        }

        // Step 9: Plan Builder + execution.
        sink.emit(StreamEvent::PipelineStage {
            run_id: run_id.clone(),
            stage: PipelineStageKind::ExecutionStart,
            message: "building execution plan".to_string(),
            metadata: None,
        });
        let plan_files: Vec<PlanInputFile> = normalized_files
            .iter()
            .map(|f| PlanInputFile { id: f.input.id.clone(), mime_type: f.input.mime_type.clone() })
            .collect();
        let plan_builder = PlanBuilder::new(self.provider.as_ref(), self.config.chat_model.clone());
        let plan_input = PlanBuilderInput {
            message: input.message.clone(),
            files: plan_files,
            workspace_id: input.workspace_id.clone(),
            profile_id: input.profile_id.clone(),
            message_id: message_id.clone(),
            use_llm: input.use_llm,
            project_id: project_decision.project_id.clone(),
            effective_playbooks: effective_playbooks.clone(),
            expected_artifacts: input.expected_artifacts.clone(),
        };
        let plan = plan_builder.build(plan_input).await?;
        sink.emit(StreamEvent::ExecutionPlan { plan: plan.clone() });

        let execution_id = cco_proto::ExecutionId::new(Uuid::new_v4().to_string());
        let mut pending_tasks = Vec::new();
        if plan.tasks.is_empty() {
            sink.emit(StreamEvent::PipelineStage {
                run_id: run_id.clone(),
                stage: PipelineStageKind::NoActionNeeded,
                message: "plan builder produced no tasks for this turn".to_string(),
                metadata: None,
            });
        } else {
            sink.emit(StreamEvent::PipelineStage {
                run_id: run_id.clone(),
                stage: PipelineStageKind::TaskAssignment,
                message: format!("dispatching {} task(s)", plan.tasks.len()),
                metadata: None,
            });
        }
        for task_plan in &plan.tasks {
            let (auto_execute, requires_cta) = match (task_plan.auto_execute, task_plan.requires_cta) {
                (Some(a), Some(r)) => (a, r),
                _ => Task::defaults_for(task_plan.side_effect_level),
            };
            let task = Task {
                id: TaskId::new(Uuid::new_v4().to_string()),
                workspace_id: input.workspace_id.clone(),
                message_id: message_id.clone(),
                execution_id: execution_id.clone(),
                pack_id: task_plan.pack_id.clone(),
                task_type: task_plan.task_type.clone(),
                status: TaskStatus::Pending,
                params: task_plan.params.clone(),
                result: None,
                side_effect_level: task_plan.side_effect_level,
                auto_execute,
                requires_cta,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
                error: None,
            };
            self.task_store.create(task.clone()).await?;
            sink.emit(StreamEvent::TaskUpdate { event_type: TaskUpdateKind::Created, task: task.clone() });
            pending_tasks.push(task);
        }

        // Step 10: playbook branch.
        let mut triggered_playbook = None;
        if let Some(code) = pipeline_result.as_ref().and_then(|r| r.selected_playbook_code.clone()) {
            triggered_playbook = Some(code.clone());
            match self.playbook_registry.load_run(&code, &input.locale, &input.workspace_id).await {
                Ok(Some(run)) if run.has_json() => {
                    dispatch_json_workflow(&run.playbook, &execution_id);
                    let event = match input.mode {
                        RouteMode::Agent => StreamEvent::AgentModePlaybookExecuted {
                            playbook_code: code.clone(),
                            execution_id: execution_id.clone(),
                            tasks: pending_tasks.clone(),
                        },
                        RouteMode::Execution => StreamEvent::ExecutionModePlaybookExecuted {
                            playbook_code: code.clone(),
                            execution_id: execution_id.clone(),
                            tasks: pending_tasks.clone(),
                        },
                    };
                    sink.emit(event);
                }
                Ok(_) => {
                    sink.emit(StreamEvent::PlaybookTriggered {
                        playbook_code: code.clone(),
                        execution_id: execution_id.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, playbook_code = %code, "failed to load selected playbook");
                }
            }
        } else {
            sink.emit(StreamEvent::PipelineStage {
                run_id: run_id.clone(),
                stage: PipelineStageKind::NoPlaybookFound,
                message: "no playbook resolved for this turn".to_string(),
                metadata: None,
            });
        }

        if is_cancelled(cancel) {
            self.skip_pending_tasks(&pending_tasks, sink).await;
            return Ok(cancelled_outcome(input.workspace_id, user_event_id, display_events));
        }

        // Step 11: QA fallback.
        let mut context_tokens = 0u32;
        if triggered_playbook.is_none() {
            sink.emit(StreamEvent::PipelineStage {
                run_id: run_id.clone(),
                stage: PipelineStageKind::ContextBuilding,
                message: "assembling context for the conversational reply".to_string(),
                metadata: None,
            });
            context_tokens = self
                .run_qa_fallback(&input, thread_id.as_ref(), &message_id, &effective_playbooks)
                .await?;
        }

        // Step 12: post-turn IntentSteward, observation-only unless the
        // caller's workspace setting says otherwise.
        let steward_input = AnalyzeTurnInput {
            workspace_id: input.workspace_id.clone(),
            profile_id: input.profile_id.clone(),
            turn_id: message_id.clone(),
            conversation_id: thread_id.as_ref().map(|t| t.as_str().to_string()),
            auto_intent_layout: input.auto_intent_layout,
        };
        if let Err(e) = self.steward.analyze_turn(steward_input).await {
            tracing::warn!(error = %e, "post-turn IntentSteward run failed");
        }

        Ok(RouteOutcome {
            workspace_id: input.workspace_id,
            user_event_id,
            display_events,
            triggered_playbook,
            pending_tasks,
            context_tokens,
        })
    }

    /// Mark every task in `tasks` `Skipped` (they were only ever `Pending`
    /// here, never `running`) and emit the matching `task_update` events,
    /// for a turn cancelled before it reached the QA/execution phase.
    async fn skip_pending_tasks(&self, tasks: &[Task], sink: &dyn EventSink) {
        for task in tasks {
            if let Err(e) = self
                .task_store
                .update_status(&task.id, TaskStatus::Skipped, None, None, Some(Utc::now()))
                .await
            {
                tracing::warn!(error = %e, task_id = %task.id, "failed to mark cancelled task skipped");
                continue;
            }
            let mut skipped = task.clone();
            skipped.status = TaskStatus::Skipped;
            skipped.completed_at = Some(Utc::now());
            sink.emit(StreamEvent::TaskUpdate { event_type: TaskUpdateKind::Skipped, task: skipped });
        }
    }

    pub(crate) async fn append_assistant_event(
        &self,
        workspace_id: &cco_proto::WorkspaceId,
        thread_id: Option<&ThreadId>,
        message_id: &cco_proto::MessageId,
        text: &str,
    ) -> Result<EventId, CoreError> {
        let mut event = Event::new(
            EventId::new(Uuid::new_v4().to_string()),
            Utc::now(),
            Actor::Assistant,
            EventType::Message,
            workspace_id.clone(),
        );
        event.thread_id = thread_id.cloned();
        event.message_id = Some(message_id.clone());
        event.payload = json!({ "text": text });
        self.event_log.append(event).await.map_err(OrchestratorError::UserEventAppendFailed).map_err(CoreError::from)
    }

    /// The non-streaming QA path: build context, call the Provider once,
    /// append the reply as an ASSISTANT event. [`crate::streaming::StreamingExecutor`]
    /// re-implements this same context-budgeting contract for the
    /// incrementally-delivered path.
    async fn run_qa_fallback(
        &self,
        input: &RouteInput,
        thread_id: Option<&ThreadId>,
        message_id: &cco_proto::MessageId,
        effective_playbooks: &[cco_proto::PlaybookMetadata],
    ) -> Result<u32, CoreError> {
        let built = build_qa_context(&self.config, &input.message, effective_playbooks);

        let messages =
            vec![ChatMessage::system(built.prompt.clone()), ChatMessage::user(input.message.clone())];
        let completion = self
            .provider
            .chat_completion(messages, &self.config.chat_model, None, None)
            .await
            .map_err(OrchestratorError::Provider)?;

        self.append_assistant_event(&input.workspace_id, thread_id, message_id, &completion.text).await?;
        Ok(built.context_tokens)
    }
}

/// Shared QA context assembly, used by both the synchronous `route()` path
/// and the Streaming Executor so the two never drift on what "the prompt"
/// means for a given turn.
pub(crate) fn build_qa_context(
    config: &cco_proto::ConfigSnapshot,
    message: &str,
    effective_playbooks: &[cco_proto::PlaybookMetadata],
) -> crate::context::BuiltContext {
    let sections = vec![
        ContextSection::protected(
            "System",
            "You are the conversational assistant for this workspace. Answer directly.",
        ),
        ContextSection::new(
            "Workspace Context",
            format!(
                "{} playbooks available: {}",
                effective_playbooks.len(),
                effective_playbooks.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
            ),
        ),
        ContextSection::protected("User Turn", message.to_string()),
    ];
    build_context(&config.chat_model, config, sections)
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|c| c.is_cancelled())
}

fn cancelled_outcome(
    workspace_id: cco_proto::WorkspaceId,
    user_event_id: EventId,
    display_events: Vec<TimelineItem>,
) -> RouteOutcome {
    RouteOutcome {
        workspace_id,
        user_event_id,
        display_events,
        triggered_playbook: None,
        pending_tasks: Vec::new(),
        context_tokens: 0,
    }
}

fn normalize_files(files: &[RouteInputFile], recent_events: &[Event]) -> Vec<NormalizedFile> {
    files
        .iter()
        .map(|input| {
            let file_document_id = recent_events
                .iter()
                .find(|e| e.entity_ids.iter().any(|id| id == &input.id))
                .map(|e| {
                    e.payload
                        .get("file_document_id")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| e.id.as_str().to_string())
                });
            NormalizedFile { input: input.clone(), file_document_id }
        })
        .collect()
}

fn summarize_handoff(handoff: &cco_pipeline::HandoffPlan) -> String {
    let steps: Vec<&str> = handoff.steps.iter().map(|s| s.playbook_code.as_str()).collect();
    format!("This looks like a multi-step request spanning: {}.", steps.join(" -> "))
}

fn dispatch_json_workflow(playbook: &Playbook, execution_id: &cco_proto::ExecutionId) {
    // Task rows for this dispatch were already registered Pending by the
    // Plan Builder's own tasks above; a JSON-workflow playbook's own steps
    // are handed to the same Task Store out of band, so `route()` does not
    // block here waiting for them to settle (§4.H step 10 "dispatch it
    // asynchronously").
    tracing::info!(
        playbook_code = %playbook.playbook_code,
        execution_id = %execution_id,
        "dispatched JSON-workflow playbook"
    );
}

impl std::fmt::Debug for ConversationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOrchestrator").finish_non_exhaustive()
    }
}
