//! Closed, per-protocol error enums (§4.O).
//!
//! Each boundary gets its own `#[non_exhaustive]` enum ending in a catch-all
//! `Other` variant so a new failure mode from an external collaborator never
//! requires a breaking change here. [`CoreError`] is the outward-facing,
//! five-member taxonomy from §7 that every protocol error eventually folds
//! into at the orchestrator boundary.

use thiserror::Error;

/// Errors from the Event Log (§4.A).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EventLogError {
    /// The append itself failed; per §4.A this is always fatal to the caller.
    #[error("event append failed: {0}")]
    AppendFailed(String),
    /// A read was requested against an unknown workspace.
    #[error("unknown workspace: {0}")]
    UnknownWorkspace(String),
    /// Anything else, boxed from an underlying storage driver.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the Task Store (§4.B).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskStoreError {
    /// Attempted a non-monotonic status transition (e.g. `failed` → `running`).
    #[error("illegal task status transition for {task_id}: {from:?} -> {to:?}")]
    IllegalTransition {
        /// The task whose transition was rejected.
        task_id: String,
        /// The status the task held before the attempted write.
        from: String,
        /// The status the write attempted to set.
        to: String,
    },
    /// No task exists with the given id.
    #[error("task not found: {0}")]
    NotFound(String),
    /// Anything else.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the Timeline Store (§4.C).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TimelineStoreError {
    /// No timeline item exists with the given id.
    #[error("timeline item not found: {0}")]
    NotFound(String),
    /// Anything else.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the Playbook Registry (§4.D).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlaybookRegistryError {
    /// A manifest could not be parsed at registration time.
    #[error("malformed playbook manifest for {code}: {reason}")]
    MalformedManifest {
        /// The `playbook_code` the manifest declared.
        code: String,
        /// Human-readable parse failure.
        reason: String,
    },
    /// Anything else.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from a Provider Adapter (§4.E). Mirrors the closed condition set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderError {
    /// The requested model identifier is not recognised by this adapter.
    #[error("invalid model: {0}")]
    InvalidModel(String),
    /// Credentials were rejected by the vendor.
    #[error("authentication failed")]
    AuthFailed,
    /// Vendor-side rate limiting; retriable with backoff.
    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited {
        /// Vendor-advertised backoff hint, if any.
        retry_after_ms: Option<u64>,
    },
    /// Network/transport failure; retriable.
    #[error("transport error: {0}")]
    Transport(String),
    /// The vendor returned a response this adapter could not interpret. Fatal.
    #[error("unreadable provider response: {0}")]
    BadResponse(String),
    /// The provider does not implement streaming completions at all.
    #[error("provider does not support streaming")]
    SamplingNotSupported,
}

impl ProviderError {
    /// Whether a caller may retry the same request after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transport(_))
    }
}

/// Errors from a Hook (§4.J body execution).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HookError {
    /// The hook's own body failed; per §4.J this is swallowed by the runner
    /// into a `failed` HookRun row and never propagated to the caller.
    #[error("hook body failed: {0}")]
    BodyFailed(String),
    /// Anything else.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the Sampling Gate (§4.K).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SamplingError {
    /// `template` is not a member of `ALLOWED_TEMPLATES`.
    #[error("template not allowed: {0}")]
    TemplateNotAllowed(String),
    /// The per-workspace sliding-window rate limit was exceeded.
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    /// The sampling call did not return within `SAMPLING_TIMEOUT`.
    #[error("sampling timed out")]
    Timeout,
    /// The configured client does not support server-initiated sampling.
    #[error("sampling not supported by client")]
    NotSupported,
    /// Every fallback tier was exhausted without producing a result.
    #[error("all fallback tiers exhausted: {0}")]
    AllTiersExhausted(String),
}

/// Errors raised by `route` itself, independent of which stage produced them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    /// A required system setting (e.g. `chat_model`) was not configured.
    #[error("configuration error: {0}")]
    Config(String),
    /// The Event Log rejected the USER event append; the turn cannot proceed.
    #[error("failed to record user turn: {0}")]
    UserEventAppendFailed(#[from] EventLogError),
    /// Provider invocation failed in a way the Streaming Executor treats as
    /// fatal for the turn.
    #[error("provider invocation failed: {0}")]
    Provider(#[from] ProviderError),
    /// Anything else.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The outward-facing, five-member error taxonomy from §7.
///
/// Every lower-level protocol error above maps into exactly one variant here
/// via an explicit `From` impl, so the mapping is exhaustively checked by the
/// compiler rather than asserted in documentation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Malformed request, missing required field, unknown workspace. Never
    /// appears as an event; surfaced as a 4xx-shaped response by the caller.
    #[error("user error: {0}")]
    UserError(String),
    /// A required setting is missing (e.g. `chat_model`). No retry.
    #[error("configuration error: {0}")]
    ConfigError(String),
    /// Rate-limited or transport failure from an LLM provider. Retriable by
    /// the caller; fatal for the current turn.
    #[error("transient provider error: {0}")]
    TransientProviderError(#[source] ProviderError),
    /// Append conflict or duplicate idempotency key. The caller observes the
    /// deterministic winner's result.
    #[error("integrity error: {0}")]
    IntegrityError(String),
    /// Anything else. Logged with a stack trace by the caller; the turn ends
    /// with an `error` event.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<OrchestratorError> for CoreError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Config(msg) => CoreError::ConfigError(msg),
            OrchestratorError::UserEventAppendFailed(e) => {
                CoreError::InternalError(format!("event append failed: {e}"))
            }
            OrchestratorError::Provider(e) if e.is_retryable() => {
                CoreError::TransientProviderError(e)
            }
            OrchestratorError::Provider(e) => CoreError::InternalError(e.to_string()),
            OrchestratorError::Other(e) => CoreError::InternalError(e.to_string()),
        }
    }
}

impl From<EventLogError> for CoreError {
    fn from(err: EventLogError) -> Self {
        CoreError::InternalError(err.to_string())
    }
}

impl From<TaskStoreError> for CoreError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::IllegalTransition { .. } => CoreError::IntegrityError(err.to_string()),
            other => CoreError::InternalError(other.to_string()),
        }
    }
}

impl From<TimelineStoreError> for CoreError {
    fn from(err: TimelineStoreError) -> Self {
        CoreError::InternalError(err.to_string())
    }
}

impl From<PlaybookRegistryError> for CoreError {
    fn from(err: PlaybookRegistryError) -> Self {
        match err {
            PlaybookRegistryError::MalformedManifest { .. } => {
                CoreError::UserError(err.to_string())
            }
            other => CoreError::InternalError(other.to_string()),
        }
    }
}

impl From<HookError> for CoreError {
    fn from(err: HookError) -> Self {
        CoreError::InternalError(err.to_string())
    }
}

impl From<ProviderError> for CoreError {
    fn from(err: ProviderError) -> Self {
        if err.is_retryable() {
            CoreError::TransientProviderError(err)
        } else {
            CoreError::InternalError(err.to_string())
        }
    }
}

impl From<SamplingError> for CoreError {
    fn from(err: SamplingError) -> Self {
        CoreError::InternalError(err.to_string())
    }
}
