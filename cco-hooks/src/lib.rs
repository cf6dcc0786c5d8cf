#![deny(missing_docs)]
//! # cco-hooks — Event-Hook Runner and Sampling Gate
//!
//! After a turn is durably recorded, [`HookRunner::on_chat_synced`] runs the
//! fixed `intent_extract` → `steward_analyze` hook pipeline: each step is
//! idempotency-guarded against a [`cco_proto::HookRunLedger`] row and gated
//! by a caller-supplied IDE [`cco_proto::Receipt`] (§4.J). [`SamplingGate`]
//! wraps any server-initiated LLM call in the fallback ladder described in
//! §4.K, so a hook body never hard-fails just because MCP sampling is
//! unavailable.

mod prompts;
mod receipt;
mod redact;
mod runner;
mod sampling;

pub use prompts::{
    build_agent_task_dispatch_prompt, build_intent_extract_prompt, build_steward_analyze_prompt,
    SamplingRequest, Template,
};
pub use receipt::{evaluate, find_receipt};
pub use redact::redact;
pub use runner::{ChatSyncedInput, HookRunner};
pub use sampling::{SamplingFuture, SamplingGate};
