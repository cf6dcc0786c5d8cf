//! IntentSteward: signal prefilter, clusterer, and LLM-assisted
//! IntentCard layout planner (§4.L).

#![deny(missing_docs)]

mod heuristic;
mod llm;
mod prefilter;
mod steward;
mod types;

pub use steward::IntentSteward;
pub use types::AnalyzeTurnInput;
