//! Adapter for the OpenAI Chat Completions API.

use std::pin::Pin;

use async_trait::async_trait;
use cco_proto::{ChatCompletion, ChatDelta, ChatMessage, ChatRole, Provider, ProviderError, ProviderType, Usage};
use futures::{Stream, StreamExt};

use crate::error::{map_http_status, map_reqwest_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for the OpenAI Chat Completions API.
///
/// Implements [`Provider`]. Unlike Anthropic, OpenAI accepts `system` as an
/// ordinary message role inline in the `messages` array, so no folding is
/// needed here.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
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

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request_body(&self, messages: &[ChatMessage], model: &str, temperature: Option<f32>, max_tokens: Option<u32>, stream: bool) -> serde_json::Value {
        let turns: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                };
                serde_json::json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = serde_json::json!({ "model": model, "messages": turns, "stream": stream });
        if let Some(t) = temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(mt) = max_tokens {
            body["max_tokens"] = serde_json::json!(mt);
        }
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        body
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
    }
}

fn parse_completion_response(json: &serde_json::Value) -> Result<ChatCompletion, ProviderError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| ProviderError::BadResponse("response had no choices[0].message.content".into()))?
        .to_string();

    let usage = Usage {
        input_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    Ok(ChatCompletion { text, usage })
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<ChatCompletion, ProviderError> {
        let body = self.build_request_body(&messages, model, temperature, max_tokens, false);
        tracing::debug!(model, "sending openai completion request");

        let response =
            self.request_builder(&self.chat_completions_url()).json(&body).send().await.map_err(map_reqwest_error)?;
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
        tracing::debug!(model, "sending openai streaming completion request");

        let response =
            self.request_builder(&self.chat_completions_url()).json(&body).send().await.map_err(map_reqwest_error)?;
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
        let mut input_tokens: u32 = 0;
        let mut output_tokens: u32 = 0;
        let mut bytes_stream = std::pin::pin!(byte_stream);

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

                let Some(data) = line.strip_prefix("data: ") else { continue };
                if data == "[DONE]" {
                    yield Ok(ChatDelta {
                        content: String::new(),
                        is_final: true,
                        usage: Some(Usage { input_tokens, output_tokens }),
                    });
                    return;
                }

                let Ok(json) = serde_json::from_str::<serde_json::Value>(data) else { continue };
                if let Some(text) = json["choices"][0]["delta"]["content"].as_str() {
                    if !text.is_empty() {
                        yield Ok(ChatDelta { content: text.to_string(), is_final: false, usage: None });
                    }
                }
                if let Some(v) = json["usage"]["prompt_tokens"].as_u64() {
                    input_tokens = v as u32;
                }
                if let Some(v) = json["usage"]["completion_tokens"].as_u64() {
                    output_tokens = v as u32;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_role_passes_through_inline() {
        let provider = OpenAiProvider::new("sk-test");
        let messages = vec![ChatMessage::system("Be concise."), ChatMessage::user("Hello")];
        let body = provider.build_request_body(&messages, "gpt-4o", None, None, false);
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
    }

    #[test]
    fn parses_choice_content_and_usage() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "hi there"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2},
        });
        let completion = parse_completion_response(&json).unwrap();
        assert_eq!(completion.text, "hi there");
        assert_eq!(completion.usage.total(), 7);
    }

    #[test]
    fn missing_choices_is_a_bad_response() {
        let json = serde_json::json!({"choices": [], "usage": {}});
        assert!(parse_completion_response(&json).is_err());
    }
}
