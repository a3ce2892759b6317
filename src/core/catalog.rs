//! Model catalog
//!
//! Static registry mapping logical model names to provider mappings with
//! pricing and capability flags. Loaded once at process start, never mutated,
//! and therefore safe for unsynchronized concurrent reads from every request
//! handler. Reloading requires a process restart.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Upstream provider identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "groq")]
    Groq,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Mistral => "mistral",
            ProviderId::Groq => "groq",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing and capability record tying a logical model to one upstream
/// provider's implementation of it.
///
/// Prices are USD per token. An absent price means cost for that dimension is
/// unknowable and must propagate as null, never zero.
#[derive(Debug, Clone, Copy)]
pub struct ProviderMapping {
    pub provider: ProviderId,
    /// Model identifier the provider expects on the wire
    pub upstream_model: &'static str,
    /// Input price per token (USD)
    pub input_price: Option<f64>,
    /// Output price per token (USD)
    pub output_price: Option<f64>,
    /// Image-input price per token (USD), for vision-capable mappings
    pub image_price: Option<f64>,
    /// Context window limit in tokens
    pub context_length: Option<u32>,
    pub supports_streaming: bool,
}

/// One logical model and its ordered provider mappings
///
/// The first mapping is the default route for the model.
#[derive(Debug, Clone, Copy)]
pub struct ModelDefinition {
    pub id: &'static str,
    pub mappings: &'static [ProviderMapping],
    pub supports_json_mode: bool,
    pub supports_image_input: bool,
}

impl ModelDefinition {
    /// Default (first) provider mapping
    pub fn default_mapping(&self) -> &'static ProviderMapping {
        &self.mappings[0]
    }

    /// Mapping for a specific provider, if the model is served by it
    pub fn mapping_for(&self, provider: ProviderId) -> Option<&'static ProviderMapping> {
        self.mappings.iter().find(|m| m.provider == provider)
    }
}

/// The static catalog. Every definition has at least one mapping and mappings
/// within a definition are unique per provider.
pub static CATALOG: &[ModelDefinition] = &[
    ModelDefinition {
        id: "gpt-4",
        mappings: &[ProviderMapping {
            provider: ProviderId::OpenAi,
            upstream_model: "gpt-4",
            input_price: Some(0.00001),
            output_price: Some(0.00003),
            image_price: None,
            context_length: Some(8_192),
            supports_streaming: true,
        }],
        supports_json_mode: false,
        supports_image_input: false,
    },
    ModelDefinition {
        id: "gpt-4o",
        mappings: &[ProviderMapping {
            provider: ProviderId::OpenAi,
            upstream_model: "gpt-4o",
            input_price: Some(0.0000025),
            output_price: Some(0.00001),
            image_price: Some(0.0000025),
            context_length: Some(128_000),
            supports_streaming: true,
        }],
        supports_json_mode: true,
        supports_image_input: true,
    },
    ModelDefinition {
        id: "gpt-4o-mini",
        mappings: &[ProviderMapping {
            provider: ProviderId::OpenAi,
            upstream_model: "gpt-4o-mini",
            input_price: Some(0.00000015),
            output_price: Some(0.0000006),
            image_price: Some(0.00000015),
            context_length: Some(128_000),
            supports_streaming: true,
        }],
        supports_json_mode: true,
        supports_image_input: true,
    },
    ModelDefinition {
        id: "gpt-3.5-turbo",
        mappings: &[ProviderMapping {
            provider: ProviderId::OpenAi,
            upstream_model: "gpt-3.5-turbo",
            input_price: Some(0.0000005),
            output_price: Some(0.0000015),
            image_price: None,
            context_length: Some(16_385),
            supports_streaming: true,
        }],
        supports_json_mode: true,
        supports_image_input: false,
    },
    // o1-mini rejects the stream flag upstream, so the capability is off here
    ModelDefinition {
        id: "o1-mini",
        mappings: &[ProviderMapping {
            provider: ProviderId::OpenAi,
            upstream_model: "o1-mini",
            input_price: Some(0.000003),
            output_price: Some(0.000012),
            image_price: None,
            context_length: Some(128_000),
            supports_streaming: false,
        }],
        supports_json_mode: false,
        supports_image_input: false,
    },
    ModelDefinition {
        id: "claude-3-5-sonnet",
        mappings: &[ProviderMapping {
            provider: ProviderId::Anthropic,
            upstream_model: "claude-3-5-sonnet-20241022",
            input_price: Some(0.000003),
            output_price: Some(0.000015),
            image_price: Some(0.000003),
            context_length: Some(200_000),
            supports_streaming: true,
        }],
        supports_json_mode: false,
        supports_image_input: true,
    },
    ModelDefinition {
        id: "claude-3-haiku",
        mappings: &[ProviderMapping {
            provider: ProviderId::Anthropic,
            upstream_model: "claude-3-haiku-20240307",
            input_price: Some(0.00000025),
            output_price: Some(0.00000125),
            image_price: Some(0.00000025),
            context_length: Some(200_000),
            supports_streaming: true,
        }],
        supports_json_mode: false,
        supports_image_input: true,
    },
    ModelDefinition {
        id: "mistral-large",
        mappings: &[ProviderMapping {
            provider: ProviderId::Mistral,
            upstream_model: "mistral-large-latest",
            input_price: Some(0.000002),
            output_price: Some(0.000006),
            image_price: None,
            context_length: Some(128_000),
            supports_streaming: true,
        }],
        supports_json_mode: true,
        supports_image_input: false,
    },
    ModelDefinition {
        id: "mixtral-8x7b",
        mappings: &[
            ProviderMapping {
                provider: ProviderId::Groq,
                upstream_model: "mixtral-8x7b-32768",
                input_price: Some(0.00000024),
                output_price: Some(0.00000024),
                image_price: None,
                context_length: Some(32_768),
                supports_streaming: true,
            },
            ProviderMapping {
                provider: ProviderId::Mistral,
                upstream_model: "open-mixtral-8x7b",
                input_price: Some(0.0000007),
                output_price: Some(0.0000007),
                image_price: None,
                context_length: Some(32_768),
                supports_streaming: true,
            },
        ],
        supports_json_mode: false,
        supports_image_input: false,
    },
    ModelDefinition {
        id: "llama-3.1-8b",
        mappings: &[ProviderMapping {
            provider: ProviderId::Groq,
            upstream_model: "llama-3.1-8b-instant",
            input_price: Some(0.00000005),
            output_price: Some(0.00000008),
            image_price: None,
            context_length: Some(131_072),
            supports_streaming: true,
        }],
        supports_json_mode: false,
        supports_image_input: false,
    },
    // Preview deployment without published pricing: tokens are still counted,
    // cost stays null.
    ModelDefinition {
        id: "llama-3.1-405b",
        mappings: &[ProviderMapping {
            provider: ProviderId::Groq,
            upstream_model: "llama-3.1-405b-reasoning",
            input_price: None,
            output_price: None,
            image_price: None,
            context_length: Some(131_072),
            supports_streaming: true,
        }],
        supports_json_mode: false,
        supports_image_input: false,
    },
];

static INDEX: Lazy<HashMap<&'static str, &'static ModelDefinition>> =
    Lazy::new(|| CATALOG.iter().map(|m| (m.id, m)).collect());

/// Exact-match lookup of a logical model name. No fuzzy matching: an unknown
/// model must be rejected by the router rather than silently defaulted.
pub fn find_model(model: &str) -> Option<&'static ModelDefinition> {
    INDEX.get(model).copied()
}

/// All model definitions, in catalog order
pub fn list_models() -> &'static [ModelDefinition] {
    CATALOG
}

/// Distinct providers referenced by the catalog, in first-seen order
pub fn list_providers() -> Vec<ProviderId> {
    let mut seen = Vec::new();
    for model in CATALOG {
        for mapping in model.mappings {
            if !seen.contains(&mapping.provider) {
                seen.push(mapping.provider);
            }
        }
    }
    seen
}
