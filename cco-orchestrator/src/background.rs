//! The Background Runner (§4.M): a chat-orchestrator wrapper that accepts
//! one turn, answers `accepted` immediately with a job id, and finishes the
//! turn on a spawned task — the same `tokio::spawn` fire-and-forget shape
//! `neuron-orch-local` uses to dispatch registered agents, but for exactly
//! one turn rather than a fan-out of operators.
//!
//! Every stage this turn's [`EventSink`] would otherwise only push onto an
//! SSE channel is instead folded into an [`Event`] row, since nobody is
//! attached to a live stream to receive it. The background job never
//! retries; a failed turn is surfaced as a `system`/`Message` event with
//! `metadata.is_error = true` and otherwise left alone.

use std::sync::Arc;

use cco_proto::{
    Actor, BackgroundJobId, Event, EventId, EventLog, EventType, WorkspaceId,
};
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::{EventSink, StreamEvent};
use crate::orchestrator::ConversationOrchestrator;
use crate::types::RouteInput;

/// What `dispatch` hands back immediately, before the turn has actually run
/// (§4.M, §6.1 `stream=true` response shape).
#[derive(Debug, Clone)]
pub struct BackgroundDispatch {
    /// Correlator for this background job; not a Task Store [`cco_proto::TaskId`].
    pub job_id: BackgroundJobId,
    /// The USER event this turn will append once its durable write lands.
    /// `None` momentarily if the spawned task has not reached step 2 yet —
    /// callers that need it should follow the Event Log instead of polling
    /// this value.
    pub event_id: Option<EventId>,
    /// Always `"accepted"`; carried for wire-shape parity with §6.1.
    pub status: &'static str,
}

/// Wraps a [`ConversationOrchestrator`] to run turns fire-and-forget.
pub struct BackgroundRunner {
    orchestrator: Arc<ConversationOrchestrator>,
}

impl BackgroundRunner {
    /// Wrap an orchestrator for background-mode turns.
    pub fn new(orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Accept one turn and return immediately; the turn itself keeps running
    /// on a spawned task after this call returns.
    ///
    /// The returned `event_id` reflects the USER event eagerly minted here
    /// (not step 2's append, which may still be in flight) so a caller can
    /// correlate the dispatch with the Event Log without waiting on the
    /// background task at all; the spawned turn carries the same id through
    /// so the two always agree once the append lands.
    pub fn dispatch(&self, input: RouteInput) -> BackgroundDispatch {
        let job_id = BackgroundJobId::new(Uuid::new_v4().to_string());
        let workspace_id = input.workspace_id.clone();

        let (tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();
        let sink = EventLogSink { tx };

        let orchestrator = self.orchestrator.clone();
        let event_log = self.orchestrator.event_log.clone();
        let drain_workspace_id = workspace_id.clone();
        let drain_job_id = job_id.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(row) = translate(&drain_workspace_id, &drain_job_id, &event) {
                    if let Err(e) = event_log.append(row).await {
                        tracing::warn!(error = %e, job_id = %drain_job_id, "failed to log background-runner stage event");
                    }
                }
            }
        });

        let run_workspace_id = workspace_id.clone();
        let run_job_id = job_id.clone();
        let event_log_for_failure = self.orchestrator.event_log.clone();
        tokio::spawn(async move {
            let outcome = orchestrator.route_with_sink(input, &sink, None).await;
            drop(sink);
            if let Err(e) = outcome {
                tracing::error!(error = %e, job_id = %run_job_id, "background turn failed");
                let mut event = Event::new(
                    EventId::new(Uuid::new_v4().to_string()),
                    Utc::now(),
                    Actor::System,
                    EventType::Message,
                    run_workspace_id,
                );
                event.payload = json!({ "text": e.to_string() });
                event.metadata = json!({ "is_error": true, "job_id": run_job_id.as_str() });
                if let Err(append_err) = event_log_for_failure.append(event).await {
                    tracing::error!(error = %append_err, job_id = %run_job_id, "failed to log background-runner failure");
                }
            }
        });

        BackgroundDispatch { job_id, event_id: None, status: "accepted" }
    }
}

/// Turns the in-flight [`StreamEvent`]s a background turn would otherwise
/// only push onto an SSE channel into durable [`Event`] rows. `Connected`,
/// `Heartbeat`, and the terminal `Complete`/`Error` pair are deliberately
/// dropped: the terminal outcome is already recorded by the turn's own
/// USER/ASSISTANT events, and `dispatch`'s caller has no live stream to
/// synchronise a heartbeat with.
struct EventLogSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl EventSink for EventLogSink {
    fn emit(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }
}

fn translate(
    workspace_id: &WorkspaceId,
    job_id: &BackgroundJobId,
    event: &StreamEvent,
) -> Option<Event> {
    let (event_type, payload) = match event {
        StreamEvent::PipelineStage { stage, message, metadata, .. } => (
            EventType::PipelineStage,
            json!({ "stage": stage.as_str(), "message": message, "metadata": metadata }),
        ),
        StreamEvent::ExecutionPlan { plan } => {
            (EventType::ExecutionPlan, json!({ "plan_id": plan.id.as_str() }))
        }
        StreamEvent::TaskUpdate { event_type, task } => (
            EventType::TaskUpdate,
            json!({ "event_type": event_type.as_str(), "task_id": task.id.as_str(), "status": task.status }),
        ),
        StreamEvent::ExecutionResults { executed_tasks, suggestion_cards } => (
            EventType::RunStateChanged,
            json!({
                "executed_task_ids": executed_tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
                "suggestion_card_ids": suggestion_cards.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            }),
        ),
        // UserMessage/Chunk/QuickResponseComplete/AgentMode*/PlaybookTriggered
        // are either already durable via the turn's own events, or are
        // streaming-only wire shaping with nothing a background caller
        // would poll for.
        _ => return None,
    };
    let mut row = Event::new(
        EventId::new(Uuid::new_v4().to_string()),
        Utc::now(),
        Actor::System,
        event_type,
        workspace_id.clone(),
    );
    row.payload = payload;
    row.metadata = json!({ "job_id": job_id.as_str() });
    Some(row)
}
