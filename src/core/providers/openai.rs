//! OpenAI-compatible provider adapter
//!
//! Serves the OpenAI API itself plus every upstream speaking the same wire
//! dialect (Mistral, Groq). The only differences between those deployments
//! are the base URL, the credential and the provider tag on errors.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::catalog::ProviderId;
use crate::core::types::{
    ChatChunk, ChatCompletionRequest, ChatDelta, ChatMessage, ChunkChoice, FinishReason,
    MessageRole, UpstreamUsage,
};

use super::error::ProviderError;
use super::sse::{ChunkTransformer, SseEvent, SseStream};
use super::{ChunkStream, UpstreamCallResult};

pub struct OpenAiCompatibleAdapter {
    provider: ProviderId,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

impl From<WireUsage> for UpstreamUsage {
    fn from(usage: WireUsage) -> Self {
        UpstreamUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireChunk {
    id: String,
    #[serde(default)]
    created: Option<i64>,
    model: String,
    choices: Vec<WireChunkChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChunkChoice {
    index: u32,
    delta: WireDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireDelta {
    #[serde(default)]
    role: Option<MessageRole>,
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleAdapter {
    pub fn new(
        provider: ProviderId,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn wire_request<'a>(
        &self,
        request: &'a ChatCompletionRequest,
        upstream_model: &'a str,
        stream: bool,
    ) -> WireRequest<'a> {
        WireRequest {
            model: upstream_model,
            messages: &request.messages,
            stream,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
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
            .bearer_auth(&self.api_key)
            .json(&self.wire_request(request, upstream_model, stream))
            .send()
            .await
            .map_err(|e| ProviderError::network(self.provider, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::upstream(
                self.provider,
                status.as_u16(),
                extract_error_message(&body),
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
            .map_err(|e| ProviderError::parse(self.provider, e.to_string()))?;

        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::parse(self.provider, "response has no choices"))?;

        Ok(UpstreamCallResult {
            content: choice.message.content.unwrap_or_default(),
            upstream_model: wire.model,
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::from_openai)
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
        let transformer = OpenAiTransformer {
            provider: self.provider,
        };
        Ok(SseStream::new(response.bytes_stream().boxed(), transformer).boxed())
    }
}

/// Pull a human-readable message out of an upstream error body
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value
            .pointer("/error/message")
            .or_else(|| value.pointer("/message"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "upstream error".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Transforms OpenAI-dialect SSE data events into unified chunks
pub struct OpenAiTransformer {
    provider: ProviderId,
}

impl ChunkTransformer for OpenAiTransformer {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn transform(&mut self, event: &SseEvent) -> Result<Option<ChatChunk>, ProviderError> {
        if event.data.is_empty() {
            return Ok(None);
        }
        let wire: WireChunk = serde_json::from_str(&event.data)
            .map_err(|e| ProviderError::parse(self.provider, format!("bad SSE chunk: {e}")))?;

        let choices = wire
            .choices
            .into_iter()
            .map(|choice| ChunkChoice {
                index: choice.index,
                delta: ChatDelta {
                    role: choice.delta.role,
                    content: choice.delta.content,
                },
                finish_reason: choice
                    .finish_reason
                    .as_deref()
                    .map(FinishReason::from_openai),
            })
            .collect();

        Ok(Some(ChatChunk {
            id: wire.id,
            object: "chat.completion.chunk".to_string(),
            created: wire.created.unwrap_or_else(|| chrono::Utc::now().timestamp()),
            model: wire.model,
            choices,
            usage: wire.usage.map(UpstreamUsage::from),
        }))
    }
}
