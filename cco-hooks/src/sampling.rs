//! Sampling Gate: the fallback ladder wrapping any server-initiated LLM
//! call (§4.K).

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use cco_proto::{ConfigSnapshot, SamplingError, WorkspaceId};
use tokio::sync::Mutex;

use crate::prompts::Template;
use crate::redact::redact;

/// A boxed, not-yet-polled sampling attempt. Lazy by construction, so
/// passing an unpolled fallback future costs nothing until the gate
/// actually needs it.
pub type SamplingFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, SamplingError>> + Send>>;

/// Which tier ultimately produced a [`cco_proto::SamplingResult`].
pub use cco_proto::SamplingSource;

/// Per-workspace sliding-window rate limiter plus the fallback ladder
/// described in §4.K.
pub struct SamplingGate {
    config: ConfigSnapshot,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SamplingGate {
    /// Build a gate from a configuration snapshot.
    pub fn new(config: ConfigSnapshot) -> Self {
        Self { config, windows: Mutex::new(HashMap::new()) }
    }

    async fn rate_limit_ok(&self, workspace_id: &WorkspaceId) -> bool {
        let window = Duration::from_secs(self.config.rate_window_seconds);
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(workspace_id.as_str().to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) > window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() as u32 >= self.config.rate_limit {
            return false;
        }
        entry.push_back(now);
        true
    }

    /// Redact a prompt string before it is handed to `sampling_fn`, per
    /// §4.K's redaction rule.
    pub fn redact_prompt(&self, prompt: &str) -> String {
        redact(prompt)
    }

    /// Run the fallback ladder: template allowlist, rate limit, primary
    /// sampling attempt under a timeout, tier-2 workspace-LLM fallback,
    /// tier-3 pending-card fallback.
    pub async fn with_fallback(
        &self,
        workspace_id: &WorkspaceId,
        template: Template,
        sampling_fn: SamplingFuture,
        fallback_fn: SamplingFuture,
        pending_card_fn: Option<SamplingFuture>,
    ) -> cco_proto::SamplingResult {
        let start = Instant::now();

        if !self.config.template_allowed(template.as_str()) {
            return self
                .run_fallback(
                    fallback_fn,
                    pending_card_fn,
                    start,
                    Some(format!("template_not_allowed: {}", template.as_str())),
                )
                .await;
        }

        if !self.rate_limit_ok(workspace_id).await {
            return self
                .run_fallback(fallback_fn, pending_card_fn, start, Some("rate_limit_exceeded".to_string()))
                .await;
        }

        let timeout = Duration::from_secs(self.config.sampling_timeout_seconds);
        match tokio::time::timeout(timeout, sampling_fn).await {
            Ok(Ok(data)) => cco_proto::SamplingResult {
                source: SamplingSource::McpSampling,
                data: Some(data),
                error: None,
                latency_ms: elapsed_ms(start),
            },
            Ok(Err(err)) => {
                self.run_fallback(fallback_fn, pending_card_fn, start, Some(err.to_string())).await
            }
            Err(_) => {
                self.run_fallback(fallback_fn, pending_card_fn, start, Some("sampling timed out".to_string())).await
            }
        }
    }

    async fn run_fallback(
        &self,
        fallback_fn: SamplingFuture,
        pending_card_fn: Option<SamplingFuture>,
        start: Instant,
        reason: Option<String>,
    ) -> cco_proto::SamplingResult {
        match fallback_fn.await {
            Ok(data) => cco_proto::SamplingResult {
                source: SamplingSource::WsLlm,
                data: Some(data),
                error: reason,
                latency_ms: elapsed_ms(start),
            },
            Err(tier2_err) => {
                let accumulated = match reason {
                    Some(r) => format!("{r}; {tier2_err}"),
                    None => tier2_err.to_string(),
                };
                match pending_card_fn {
                    Some(pending_fn) => match pending_fn.await {
                        Ok(data) => cco_proto::SamplingResult {
                            source: SamplingSource::PendingCard,
                            data: Some(data),
                            error: Some(accumulated),
                            latency_ms: elapsed_ms(start),
                        },
                        Err(tier3_err) => cco_proto::SamplingResult {
                            source: SamplingSource::PendingCard,
                            data: None,
                            error: Some(format!("{accumulated}; {tier3_err}")),
                            latency_ms: elapsed_ms(start),
                        },
                    },
                    None => cco_proto::SamplingResult {
                        source: SamplingSource::WsLlm,
                        data: None,
                        error: Some(accumulated),
                        latency_ms: elapsed_ms(start),
                    },
                }
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
