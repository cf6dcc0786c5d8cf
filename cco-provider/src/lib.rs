#![deny(missing_docs)]
//! Vendor Provider Adapters (§4.E).
//!
//! Two concrete adapters — [`AnthropicProvider`] and [`OpenAiProvider`] —
//! translate the closed [`cco_proto::Provider`] surface into each vendor's
//! own wire format, grounded on the request-building / status-mapping /
//! SSE-parsing shape of a typical first-party HTTP provider client.

mod anthropic;
mod error;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
