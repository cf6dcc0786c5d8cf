#![deny(missing_docs)]
//! # cco-plan — Plan Builder for the conversation orchestration core
//!
//! Turns one turn's message, attached files, and the effective playbook set
//! into an [`cco_proto::ExecutionPlan`]: an LLM-structured plan when
//! available, falling back to a deterministic rule-based planner otherwise
//! (§4.G).

mod builder;
mod llm;
mod rules;
mod types;

pub use builder::PlanBuilder;
pub use rules::{CONTENT_DRAFTING_PACK, DOCUMENT_ANALYSIS_PACK, FILE_ANALYSIS_PACK, IMAGE_ANALYSIS_PACK};
pub use types::{PlanBuilderInput, PlanInputFile};
