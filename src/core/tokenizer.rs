//! Token estimation
//!
//! Produces token counts for accounting when the upstream does not report
//! usage. Explicit upstream counts always win; otherwise counts are derived
//! from captured text with tiktoken. Estimation never fails a request: any
//! failure to derive a count leaves that field null.

use once_cell::sync::Lazy;
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base};
use tracing::warn;

use super::types::ChatMessage;

// Encoders are expensive to build, so they are constructed once and shared.
static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| match cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!(error = %e, "failed to initialize cl100k_base encoder");
        None
    }
});

static O200K: Lazy<Option<CoreBPE>> = Lazy::new(|| match o200k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!(error = %e, "failed to initialize o200k_base encoder");
        None
    }
});

// Chat message framing overhead, matching OpenAI's published counting recipe.
const TOKENS_PER_MESSAGE: u32 = 4;
const REPLY_PRIMING_TOKENS: u32 = 3;

/// Estimated token counts, each side independently nullable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenEstimate {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Raw text captured from a request/response pair, used as estimation input
/// when explicit counts are missing.
#[derive(Debug, Clone, Default)]
pub struct RawContent {
    /// Flat prompt text, when no structured messages are available
    pub prompt: Option<String>,
    /// Accumulated completion text
    pub completion: Option<String>,
    /// Structured request messages, preferred over `prompt`
    pub messages: Option<Vec<ChatMessage>>,
}

impl RawContent {
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        Self {
            prompt: None,
            completion: None,
            messages: Some(messages.to_vec()),
        }
    }

    pub fn with_completion(mut self, completion: impl Into<String>) -> Self {
        self.completion = Some(completion.into());
        self
    }
}

/// Encoder for a logical model name
///
/// Newer OpenAI families use o200k; everything else is approximated with
/// cl100k, which is close enough for accounting purposes on non-OpenAI
/// vocabularies.
fn encoder_for(model: &str) -> Option<&'static CoreBPE> {
    let o200k = model.starts_with("gpt-4o")
        || model.starts_with("chatgpt-4o")
        || model.starts_with("o1")
        || model.starts_with("o3");
    if o200k {
        O200K.as_ref()
    } else {
        CL100K.as_ref()
    }
}

/// Count tokens in a flat piece of text
pub fn count_text(model: &str, text: &str) -> Option<u32> {
    let bpe = encoder_for(model)?;
    Some(bpe.encode_with_special_tokens(text).len() as u32)
}

/// Count tokens across chat messages, including per-message framing overhead
/// and the assistant reply priming.
pub fn count_messages(model: &str, messages: &[ChatMessage]) -> Option<u32> {
    let bpe = encoder_for(model)?;
    let mut total = 0u32;
    for message in messages {
        total += TOKENS_PER_MESSAGE;
        total += bpe.encode_with_special_tokens(&message.content).len() as u32;
        if let Some(name) = &message.name {
            total += bpe.encode_with_special_tokens(name).len() as u32;
        }
    }
    Some(total + REPLY_PRIMING_TOKENS)
}

/// Resolve final token counts for one request
///
/// Explicit upstream counts take precedence per field. A field with neither
/// an explicit count nor usable text stays `None`.
pub fn estimate(
    model: &str,
    explicit_prompt: Option<u32>,
    explicit_completion: Option<u32>,
    raw: &RawContent,
) -> TokenEstimate {
    let prompt_tokens = explicit_prompt.or_else(|| {
        if let Some(messages) = &raw.messages {
            count_messages(model, messages)
        } else {
            raw.prompt.as_deref().and_then(|text| count_text(model, text))
        }
    });
    let completion_tokens = explicit_completion.or_else(|| {
        raw.completion
            .as_deref()
            .and_then(|text| count_text(model, text))
    });
    TokenEstimate {
        prompt_tokens,
        completion_tokens,
    }
}
