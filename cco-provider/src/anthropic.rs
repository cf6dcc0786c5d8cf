//! Adapter for the Anthropic Messages API.

use std::pin::Pin;

use async_trait::async_trait;
use cco_proto::{ChatCompletion, ChatDelta, ChatMessage, ChatRole, Provider, ProviderError, ProviderType, Usage};
use futures::{Stream, StreamExt};

use crate::error::{map_http_status, map_reqwest_error};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Client for the Anthropic Messages API.
///
/// Implements [`Provider`] for use anywhere the core accepts a vendor
/// adapter. System-role messages are folded into the request's top-level
/// `system` field, as Anthropic's wire format requires.
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new client with the given API key and the production base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: DEFAULT_BASE_URL.into(), client: reqwest::Client::new() }
    }

    /// Override the API base URL, for testing against a local mock server.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request_body(&self, messages: &[ChatMessage], model: &str, temperature: Option<f32>, max_tokens: Option<u32>, stream: bool) -> serde_json::Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                let role = match m.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => unreachable!("system messages are filtered above"),
                };
                serde_json::json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": turns,
            "stream": stream,
        });
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system.join("\n\n"));
        }
        if let Some(t) = temperature {
            body["temperature"] = serde_json::json!(t);
        }
        body
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }
}

fn parse_completion_response(json: &serde_json::Value) -> Result<ChatCompletion, ProviderError> {
    let text = json["content"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() && json["content"].as_array().is_none_or(|c| c.is_empty()) {
        return Err(ProviderError::BadResponse("response had no content blocks".into()));
    }

    let usage = Usage {
        input_tokens: json["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
    };

    Ok(ChatCompletion { text, usage })
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<ChatCompletion, ProviderError> {
        let body = self.build_request_body(&messages, model, temperature, max_tokens, false);
        tracing::debug!(model, "sending anthropic completion request");

        let response =
            self.request_builder(&self.messages_url()).json(&body).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(map_http_status(status, &text));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::BadResponse(format!("invalid JSON response: {e}")))?;
        parse_completion_response(&json)
    }

    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatDelta, ProviderError>> + Send>>, ProviderError> {
        let body = self.build_request_body(&messages, model, temperature, max_tokens, true);
        tracing::debug!(model, "sending anthropic streaming completion request");

        let response =
            self.request_builder(&self.messages_url()).json(&body).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(map_reqwest_error)?;
            return Err(map_http_status(status, &text));
        }

        Ok(Box::pin(parse_sse_stream(response.bytes_stream())))
    }
}

fn parse_sse_stream(
    byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = Result<ChatDelta, ProviderError>> + Send + 'static {
    async_stream::stream! {
        let mut line_buf = String::new();
        let mut data_buf = String::new();
        let mut output_tokens: u32 = 0;
        let mut input_tokens: u32 = 0;
        let mut bytes_stream = std::pin::pin!(byte_stream);

        macro_rules! dispatch_event {
            () => {{
                if !data_buf.is_empty() {
                    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&data_buf) {
                        match json["type"].as_str() {
                            Some("content_block_delta") => {
                                if let Some(text) = json["delta"]["text"].as_str() {
                                    if !text.is_empty() {
                                        yield Ok(ChatDelta { content: text.to_string(), is_final: false, usage: None });
                                    }
                                }
                            }
                            Some("message_start") => {
                                input_tokens = json["message"]["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32;
                            }
                            Some("message_delta") => {
                                if let Some(v) = json["usage"]["output_tokens"].as_u64() {
                                    output_tokens = v as u32;
                                }
                            }
                            _ => {}
                        }
                    }
                    data_buf.clear();
                }
            }};
        }

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    yield Err(ProviderError::Transport(format!("stream read error: {e}")));
                    return;
                }
            };
            let chunk_str = match std::str::from_utf8(&chunk) {
                Ok(s) => s,
                Err(e) => {
                    yield Err(ProviderError::BadResponse(format!("UTF-8 decode error: {e}")));
                    return;
                }
            };
            line_buf.push_str(chunk_str);

            while let Some(pos) = line_buf.find('\n') {
                let line = line_buf[..pos].trim_end_matches('\r').to_string();
                line_buf.drain(..=pos);

                if line.is_empty() {
                    dispatch_event!();
                } else if let Some(rest) = line.strip_prefix("data: ") {
                    data_buf.push_str(rest);
                }
            }
        }
        dispatch_event!();

        yield Ok(ChatDelta {
            content: String::new(),
            is_final: true,
            usage: Some(Usage { input_tokens, output_tokens }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_fold_into_top_level_system_field() {
        let provider = AnthropicProvider::new("sk-ant-test");
        let messages = vec![
            ChatMessage::system("Be concise."),
            ChatMessage::user("Hello"),
        ];
        let body = provider.build_request_body(&messages, "claude-sonnet-4-5", None, None, false);
        assert_eq!(body["system"], "Be concise.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn parses_text_content_and_usage() {
        let json = serde_json::json!({
            "content": [{"type": "text", "text": "hi there"}],
            "usage": {"input_tokens": 10, "output_tokens": 3},
        });
        let completion = parse_completion_response(&json).unwrap();
        assert_eq!(completion.text, "hi there");
        assert_eq!(completion.usage.total(), 13);
    }

    #[test]
    fn empty_content_array_is_a_bad_response() {
        let json = serde_json::json!({"content": [], "usage": {}});
        assert!(parse_completion_response(&json).is_err());
    }
}
