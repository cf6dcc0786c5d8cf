//! Provider Adapter request/response shapes (§4.E).
//!
//! These types are the closed surface every vendor adapter (`cco-provider`)
//! translates its own wire format into, so the rest of the core never
//! branches on a concrete vendor (§9 "duck-typed provider adapter").

use serde::{Deserialize, Serialize};

/// Who authored a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// The system prompt / instructions prefix.
    System,
    /// The human side of the conversation.
    User,
    /// The model's own prior turns.
    Assistant,
}

/// One message in a [`Provider::chat_completion`](crate::ports::Provider) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored this message.
    pub role: ChatRole,
    /// Message text. Multi-part/multimodal content is out of scope for this
    /// port; adapters that need it extend via `extra`.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Token accounting returned with a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u32,
    /// Tokens consumed by the completion.
    pub output_tokens: u32,
}

impl Usage {
    /// Total tokens billed for this call.
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Result of a synchronous [`Provider::chat_completion`](crate::ports::Provider) call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// The full completion text.
    pub text: String,
    /// Token accounting for this call.
    pub usage: Usage,
}

/// One text delta from a [`Provider::chat_completion_stream`](crate::ports::Provider) call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDelta {
    /// The incremental text content of this delta.
    pub content: String,
    /// Whether this is the terminal delta of the stream.
    pub is_final: bool,
    /// Populated on the terminal delta only.
    pub usage: Option<Usage>,
}

/// Which vendor wire format an adapter speaks, used by the Streaming Executor
/// to choose the correct token-framing path (§4.E `provider_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Anthropic Messages API shape.
    Anthropic,
    /// OpenAI Chat Completions API shape.
    OpenAi,
    /// Any other adapter, named by string.
    Other,
}
