//! Unified request/response types
//!
//! The gateway's canonical OpenAI-compatible schema, used regardless of
//! which upstream provider serves a request.

pub mod chat;
pub mod context;
pub mod responses;

pub use chat::{ChatCompletionRequest, ChatMessage, MessageRole};
pub use context::RequestContext;
pub use responses::{
    ChatChoice, ChatChunk, ChatCompletionResponse, ChatDelta, ChunkChoice, FinishReason, Usage,
    UpstreamUsage,
};
