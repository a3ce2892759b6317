//! Chat request and message types

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
///
/// Order within a request is semantically significant and is preserved
/// end to end (it also feeds tokenization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Name of message sender
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Unified chat completion request (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Logical model name, resolved against the model catalog
    pub model: String,
    /// Ordered list of chat messages
    pub messages: Vec<ChatMessage>,
    /// Enable streaming
    #[serde(default)]
    pub stream: bool,
    /// Sampling temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Frequency penalty (-2.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Presence penalty (-2.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl ChatCompletionRequest {
    /// Create a new request for the given model
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            temperature: None,
            top_p: None,
            max_tokens: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    /// Enable streaming
    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_minimal_body() {
        let body = r#"{"model":"gpt-4","messages":[{"role":"user","content":"hi"}]}"#;
        let request: ChatCompletionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.messages.len(), 1);
        assert!(!request.stream);
        assert!(request.temperature.is_none());
    }

    #[test]
    fn message_order_is_preserved() {
        let body = r#"{"model":"gpt-4","messages":[
            {"role":"system","content":"a"},
            {"role":"user","content":"b"},
            {"role":"assistant","content":"c"},
            {"role":"user","content":"d"}
        ],"stream":true}"#;
        let request: ChatCompletionRequest = serde_json::from_str(body).unwrap();
        let contents: Vec<&str> = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["a", "b", "c", "d"]);
        assert!(request.stream);
    }

    #[test]
    fn optional_name_round_trips() {
        let message = ChatMessage {
            role: MessageRole::User,
            content: "hello".to_string(),
            name: Some("alice".to_string()),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["name"], "alice");

        let anonymous = ChatMessage::user("hello");
        let json = serde_json::to_value(&anonymous).unwrap();
        assert!(json.get("name").is_none());
    }
}
