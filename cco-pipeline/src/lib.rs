#![deny(missing_docs)]
//! # cco-pipeline — three-layer Intent Pipeline classifier
//!
//! Routes one raw user utterance through interaction-type classification,
//! task-domain classification, and playbook selection, arbitrating between
//! closed rule matchers and an LLM fallback per layer (§4.F).

mod llm;
mod pipeline;
mod rules;
mod types;

pub use pipeline::IntentPipeline;
pub use types::{
    ArbitrationPolicy, DecisionMethod, HandoffPlan, InteractionType, LayerDecision, PipelineInput,
    PipelineResult, TaskDomain,
};
