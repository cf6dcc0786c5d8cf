//! The Streaming Executor (§4.I): drives [`ConversationOrchestrator::route_with_sink`]
//! in a spawned task and exposes its [`StreamEvent`]s as a `Stream`, the same
//! `mpsc` + `async_stream::stream!` shape the provider adapters use to turn
//! an SSE body into a `Stream<Item = ChatDelta>`.

use std::pin::Pin;
use std::sync::Arc;

use cco_proto::{ChatMessage, CoreError, OrchestratorError, ProviderError};
use futures::Stream;
use tokio::sync::mpsc;

use crate::cancel::{self, CancellationSignal, CancellationToken};
use crate::events::{ChannelSink, StreamEvent};
use crate::orchestrator::{build_qa_context, ConversationOrchestrator};
use crate::types::RouteInput;

/// Drives one turn's stream. Holding the returned [`CancellationToken`]
/// (from [`StreamingExecutor::execute`]) lets a caller stop the turn at its
/// next suspension point, matching §5's "a client disconnect cancels the
/// turn at its next suspension point, not mid-instruction".
pub struct StreamingExecutor {
    orchestrator: Arc<ConversationOrchestrator>,
}

impl StreamingExecutor {
    /// Wrap an orchestrator for streaming-mode turns.
    pub fn new(orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Start one turn. Returns the live event stream plus the
    /// [`CancellationToken`] that can stop it early. An uncancelled stream
    /// always ends with exactly one `Complete` or `Error` event (§4.I's
    /// closed ordering contract); a stream cancelled before the turn
    /// settles ends with no terminal event at all, per §4.I's cancellation
    /// clause ("emits no further events").
    pub fn execute(
        &self,
        input: RouteInput,
    ) -> (Pin<Box<dyn Stream<Item = StreamEvent> + Send>>, CancellationToken) {
        let (token, signal) = cancel::pair();
        let (tx, rx) = mpsc::unbounded_channel();
        let workspace_id = input.workspace_id.clone();

        tx.send(StreamEvent::Connected { workspace_id }).ok();

        let orchestrator = self.orchestrator.clone();
        let chunk_signal = signal.clone();
        tokio::spawn(async move {
            let sink = ChannelSink::new(tx.clone());
            let outcome = orchestrator.route_with_sink(input, &sink, Some(&chunk_signal)).await;
            drop(sink);

            // §4.I cancellation: "the executor ... emits no further events."
            // A turn cancelled mid-flight already short-circuited inside
            // `route_with_sink`; the only thing left to decide here is
            // whether the terminal event still belongs on the wire.
            if chunk_signal.is_cancelled() {
                return;
            }

            match outcome {
                Ok(outcome) => {
                    let _ = tx.send(StreamEvent::Complete {
                        event_id: outcome.user_event_id,
                        context_tokens: outcome.context_tokens,
                        is_final: true,
                    });
                }
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error { message: e.to_string() });
                }
            }
        });

        let stream = async_stream::stream! {
            let mut rx = rx;
            while let Some(event) = rx.recv().await {
                yield event;
            }
        };

        (Box::pin(stream), token)
    }
}

/// Stream the QA fallback's reply as `Chunk` events, preferring the
/// provider's own `chat_completion_stream` and falling back to chunking a
/// single `chat_completion` call when the provider doesn't support
/// streaming (§4.I "provider dispatch preference").
///
/// Cancellation is raced per-chunk: a disconnect stops reading from the
/// provider at the next delta rather than after the whole reply lands.
pub(crate) async fn stream_qa_reply(
    orchestrator: &ConversationOrchestrator,
    message: &str,
    effective_playbooks: &[cco_proto::PlaybookMetadata],
    message_id: Option<cco_proto::MessageId>,
    sink: &dyn crate::events::EventSink,
    signal: &mut CancellationSignal,
) -> Result<String, CoreError> {
    let built = build_qa_context(&orchestrator.config, message, effective_playbooks);
    let messages = vec![ChatMessage::system(built.prompt.clone()), ChatMessage::user(message.to_string())];

    let stream_attempt = orchestrator
        .provider
        .chat_completion_stream(messages.clone(), &orchestrator.config.chat_model, None, None)
        .await;

    let mut full_text = String::new();
    match stream_attempt {
        Ok(mut deltas) => {
            use futures::StreamExt;
            loop {
                let next = cancel::race(signal, deltas.next()).await;
                let delta = match next {
                    Ok(Some(Ok(delta))) => delta,
                    Ok(Some(Err(e))) => return Err(CoreError::from(OrchestratorError::Provider(e))),
                    Ok(None) => break,
                    Err(_cancelled) => break,
                };
                full_text.push_str(&delta.content);
                sink.emit(StreamEvent::Chunk {
                    content: delta.content,
                    message_id: message_id.clone(),
                    is_final: Some(delta.is_final),
                });
                if delta.is_final {
                    break;
                }
            }
        }
        Err(ProviderError::SamplingNotSupported) => {
            let completion = orchestrator
                .provider
                .chat_completion(messages, &orchestrator.config.chat_model, None, None)
                .await
                .map_err(OrchestratorError::Provider)?;
            full_text = completion.text;
            for (i, word) in full_text.split_inclusive(' ').enumerate() {
                let _ = i;
                sink.emit(StreamEvent::Chunk {
                    content: word.to_string(),
                    message_id: message_id.clone(),
                    is_final: None,
                });
            }
            sink.emit(StreamEvent::Chunk { content: String::new(), message_id: message_id.clone(), is_final: Some(true) });
        }
        Err(e) => return Err(CoreError::from(OrchestratorError::Provider(e))),
    }

    Ok(full_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn execute_always_opens_with_connected() {
        let orchestrator = Arc::new(test_orchestrator().await);
        let executor = StreamingExecutor::new(orchestrator);
        let input = test_input();
        let (mut stream, _token) = executor.execute(input);
        let first = stream.next().await.expect("stream should yield at least one event");
        assert!(matches!(first, StreamEvent::Connected { .. }));
    }

    #[tokio::test]
    async fn cancelling_immediately_still_yields_a_terminal_event() {
        let orchestrator = Arc::new(test_orchestrator().await);
        let executor = StreamingExecutor::new(orchestrator);
        let input = test_input();
        let (mut stream, token) = executor.execute(input);
        token.cancel();
        let mut saw_any = false;
        while stream.next().await.is_some() {
            saw_any = true;
        }
        assert!(saw_any);
    }

    async fn test_orchestrator() -> ConversationOrchestrator {
        crate::test_support::build_test_orchestrator()
    }

    fn test_input() -> RouteInput {
        crate::test_support::sample_route_input()
    }
}
