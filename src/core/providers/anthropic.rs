//! Anthropic provider adapter
//!
//! Translates between the gateway's OpenAI-compatible schema and the
//! Anthropic Messages API: system messages are lifted into the top-level
//! `system` field, `max_tokens` is mandatory upstream, and the event stream
//! spreads one completion across typed events instead of uniform chunks.

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::core::catalog::ProviderId;
use crate::core::types::{
    ChatChunk, ChatCompletionRequest, ChatDelta, ChunkChoice, FinishReason, MessageRole,
    UpstreamUsage,
};

use super::error::ProviderError;
use super::sse::{ChunkTransformer, SseEvent, SseStream};
use super::{ChunkStream, UpstreamCallResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";
// Anthropic requires max_tokens; used when the caller did not set one.
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicAdapter {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    model: String,
    content: Vec<WireContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default, Clone, Copy)]
struct WireUsage {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

impl From<WireUsage> for UpstreamUsage {
    fn from(usage: WireUsage) -> Self {
        UpstreamUsage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
        }
    }
}

impl AnthropicAdapter {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn wire_request<'a>(
        &self,
        request: &'a ChatCompletionRequest,
        upstream_model: &'a str,
        stream: bool,
    ) -> WireRequest<'a> {
        let mut system_parts = Vec::new();
        let mut messages = Vec::new();
        for message in &request.messages {
            match message.role {
                MessageRole::System => system_parts.push(message.content.as_str()),
                MessageRole::User => messages.push(WireMessage {
                    role: "user",
                    content: &message.content,
                }),
                MessageRole::Assistant => messages.push(WireMessage {
                    role: "assistant",
                    content: &message.content,
                }),
            }
        }
        WireRequest {
            model: upstream_model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            stream,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
            temperature: request.temperature,
            top_p: request.top_p,
        }
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
        upstream_model: &str,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.wire_request(request, upstream_model, stream))
            .send()
            .await
            .map_err(|e| ProviderError::network(ProviderId::Anthropic, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(serde_json::Value::as_str)
                        .map(String::from)
                })
                .unwrap_or_else(|| "upstream error".to_string());
            return Err(ProviderError::upstream(
                ProviderId::Anthropic,
                status.as_u16(),
                message,
            ));
        }
        Ok(response)
    }

    /// Buffered completion
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
        upstream_model: &str,
    ) -> Result<UpstreamCallResult, ProviderError> {
        let response = self.send(request, upstream_model, false).await?;
        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(ProviderId::Anthropic, e.to_string()))?;

        let content: String = wire
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        Ok(UpstreamCallResult {
            content,
            upstream_model: wire.model,
            finish_reason: wire
                .stop_reason
                .as_deref()
                .map(FinishReason::from_anthropic)
                .unwrap_or(FinishReason::Stop),
            usage: wire.usage.map(UpstreamUsage::from),
        })
    }

    /// Streaming completion
    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        upstream_model: &str,
    ) -> Result<ChunkStream, ProviderError> {
        let response = self.send(request, upstream_model, true).await?;
        Ok(SseStream::new(response.bytes_stream().boxed(), AnthropicTransformer::new()).boxed())
    }
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<WireEventMessage>,
    #[serde(default)]
    delta: Option<WireEventDelta>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireEventMessage {
    id: String,
    model: String,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize, Default)]
struct WireEventDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Stateful transformer for the Anthropic event stream
///
/// `message_start` establishes the id, model and input token count;
/// `content_block_delta` events carry text; `message_delta` carries the stop
/// reason and output token count; `message_stop` ends the stream.
pub struct AnthropicTransformer {
    id: String,
    model: String,
    usage: UpstreamUsage,
    started: bool,
}

impl AnthropicTransformer {
    pub fn new() -> Self {
        Self {
            id: String::new(),
            model: String::new(),
            usage: UpstreamUsage::default(),
            started: false,
        }
    }

    fn chunk(&self, delta: ChatDelta, finish_reason: Option<FinishReason>) -> ChatChunk {
        ChatChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage: None,
        }
    }
}

impl Default for AnthropicTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkTransformer for AnthropicTransformer {
    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn is_end_marker(&self, event: &SseEvent) -> bool {
        event.event.as_deref() == Some("message_stop")
    }

    fn transform(&mut self, event: &SseEvent) -> Result<Option<ChatChunk>, ProviderError> {
        if event.data.is_empty() {
            return Ok(None);
        }
        let wire: WireEvent = serde_json::from_str(&event.data).map_err(|e| {
            ProviderError::parse(ProviderId::Anthropic, format!("bad stream event: {e}"))
        })?;

        match wire.kind.as_str() {
            "message_start" => {
                if let Some(message) = wire.message {
                    self.id = message.id;
                    self.model = message.model;
                    if let Some(usage) = message.usage {
                        self.usage.merge(&usage.into());
                    }
                }
                Ok(None)
            }
            "content_block_delta" => {
                let text = wire.delta.unwrap_or_default().text.unwrap_or_default();
                let role = if self.started {
                    None
                } else {
                    self.started = true;
                    Some(MessageRole::Assistant)
                };
                Ok(Some(self.chunk(
                    ChatDelta {
                        role,
                        content: Some(text),
                    },
                    None,
                )))
            }
            "message_delta" => {
                if let Some(usage) = wire.usage {
                    self.usage.merge(&usage.into());
                }
                let finish_reason = wire
                    .delta
                    .and_then(|d| d.stop_reason)
                    .as_deref()
                    .map(FinishReason::from_anthropic)
                    .unwrap_or(FinishReason::Stop);
                let mut chunk = self.chunk(ChatDelta::default(), Some(finish_reason));
                chunk.usage = Some(self.usage);
                Ok(Some(chunk))
            }
            // ping, content_block_start, content_block_stop
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChatMessage;

    fn event(name: &str, data: &str) -> SseEvent {
        SseEvent {
            event: Some(name.to_string()),
            data: data.to_string(),
        }
    }

    #[test]
    fn system_messages_are_lifted() {
        let adapter =
            AnthropicAdapter::new("https://api.anthropic.com", "key", reqwest::Client::new());
        let request = ChatCompletionRequest::new(
            "claude-3-haiku",
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("hello"),
                ChatMessage::assistant("hi"),
                ChatMessage::user("bye"),
            ],
        );
        let wire = adapter.wire_request(&request, "claude-3-haiku-20240307", false);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["system"], "be brief");
        assert_eq!(json["messages"].as_array().unwrap().len(), 3);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn stream_events_accumulate_usage() {
        let mut transformer = AnthropicTransformer::new();

        let none = transformer
            .transform(&event(
                "message_start",
                r#"{"type":"message_start","message":{"id":"msg_1","model":"claude-3-haiku-20240307","usage":{"input_tokens":12}}}"#,
            ))
            .unwrap();
        assert!(none.is_none());

        let chunk = transformer
            .transform(&event(
                "content_block_delta",
                r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"Hello"}}"#,
            ))
            .unwrap()
            .unwrap();
        assert_eq!(chunk.content(), Some("Hello"));
        assert_eq!(chunk.id, "msg_1");
        assert_eq!(chunk.choices[0].delta.role, Some(MessageRole::Assistant));

        let terminal = transformer
            .transform(&event(
                "message_delta",
                r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":5}}"#,
            ))
            .unwrap()
            .unwrap();
        assert_eq!(terminal.finish_reason(), Some(FinishReason::Stop));
        let usage = terminal.usage.unwrap();
        assert_eq!(usage.prompt_tokens, Some(12));
        assert_eq!(usage.completion_tokens, Some(5));

        assert!(transformer.is_end_marker(&event("message_stop", r#"{"type":"message_stop"}"#)));
    }

    #[test]
    fn max_tokens_stop_reason_maps_to_length() {
        let mut transformer = AnthropicTransformer::new();
        let chunk = transformer
            .transform(&event(
                "message_delta",
                r#"{"type":"message_delta","delta":{"stop_reason":"max_tokens"},"usage":{"output_tokens":9}}"#,
            ))
            .unwrap()
            .unwrap();
        assert_eq!(chunk.finish_reason(), Some(FinishReason::Length));
    }

    #[test]
    fn ping_events_are_skipped() {
        let mut transformer = AnthropicTransformer::new();
        let none = transformer
            .transform(&event("ping", r#"{"type":"ping"}"#))
            .unwrap();
        assert!(none.is_none());
    }
}
