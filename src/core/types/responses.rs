//! Unified response types
//!
//! OpenAI-compatible response, chunk and usage shapes emitted by the gateway
//! regardless of which upstream provider served the request.

use serde::{Deserialize, Serialize};

use super::chat::{ChatMessage, MessageRole};

/// Finish reason for a completion
///
/// `cancelled`, `timeout` and `error` are synthesized by the gateway itself
/// (caller disconnect, bounded upstream wait, upstream failure); upstreams
/// only ever report the first three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Length limit reached
    Length,
    /// Content filter
    ContentFilter,
    /// Caller disconnected mid-stream
    Cancelled,
    /// Bounded upstream wait elapsed
    Timeout,
    /// Upstream or gateway failure
    Error,
}

impl FinishReason {
    /// Map an OpenAI-style finish reason string
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "length" | "max_tokens" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }

    /// Map an Anthropic stop reason string
    pub fn from_anthropic(reason: &str) -> Self {
        match reason {
            "max_tokens" => FinishReason::Length,
            _ => FinishReason::Stop,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Cancelled => "cancelled",
            FinishReason::Timeout => "timeout",
            FinishReason::Error => "error",
        }
    }
}

/// Usage statistics on the outbound (non-streaming) response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Usage {
    /// Prompt token count
    pub prompt_tokens: u32,
    /// Completion token count
    pub completion_tokens: u32,
    /// Total token count
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Token usage as reported by an upstream provider
///
/// Each field is independently nullable: a provider may report neither count,
/// one, or both. Absent counts stay `None` so accounting can fall back to
/// estimation instead of booking zeros.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct UpstreamUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
}

impl UpstreamUsage {
    /// Merge counts from a later observation, keeping already-known fields
    pub fn merge(&mut self, other: &UpstreamUsage) {
        if self.prompt_tokens.is_none() {
            self.prompt_tokens = other.prompt_tokens;
        }
        if self.completion_tokens.is_none() {
            self.completion_tokens = other.completion_tokens;
        }
    }
}

/// Chat choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Choice index
    pub index: u32,
    /// Response message
    pub message: ChatMessage,
    /// Completion reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Unified chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Gateway request identifier (`chatcmpl-<uuid>`)
    pub id: String,
    /// Always `chat.completion`
    pub object: String,
    /// Unix timestamp
    pub created: i64,
    /// Logical model name as requested
    pub model: String,
    /// Choice list
    pub choices: Vec<ChatChoice>,
    /// Usage statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Streaming delta content
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatDelta {
    /// Role (usually only in the first chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    /// Content delta
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Streaming choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Delta content
    pub delta: ChatDelta,
    /// Finish reason (set on the terminal content chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// One unified delta chunk of a streamed completion
///
/// Maps 1:1 onto one upstream stream event. The stream of chunks is finite,
/// one-shot and terminated by the transport-level end marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    pub id: String,
    /// Always `chat.completion.chunk`
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    /// Usage, when the upstream reports it (usually on the last chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UpstreamUsage>,
}

impl ChatChunk {
    /// Content delta of the first choice, if any
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
    }

    /// Finish reason of the first choice, if any
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|c| c.finish_reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_mappings() {
        assert_eq!(FinishReason::from_openai("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_openai("length"), FinishReason::Length);
        assert_eq!(
            FinishReason::from_openai("content_filter"),
            FinishReason::ContentFilter
        );
        assert_eq!(FinishReason::from_anthropic("end_turn"), FinishReason::Stop);
        assert_eq!(
            FinishReason::from_anthropic("stop_sequence"),
            FinishReason::Stop
        );
        assert_eq!(
            FinishReason::from_anthropic("max_tokens"),
            FinishReason::Length
        );
    }

    #[test]
    fn finish_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FinishReason::ContentFilter).unwrap(),
            "\"content_filter\""
        );
        assert_eq!(
            serde_json::to_string(&FinishReason::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn upstream_usage_merge_keeps_known_fields() {
        let mut usage = UpstreamUsage {
            prompt_tokens: Some(12),
            completion_tokens: None,
        };
        usage.merge(&UpstreamUsage {
            prompt_tokens: Some(99),
            completion_tokens: Some(7),
        });
        assert_eq!(usage.prompt_tokens, Some(12));
        assert_eq!(usage.completion_tokens, Some(7));
    }

    #[test]
    fn usage_totals_tokens() {
        let usage = Usage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }
}
