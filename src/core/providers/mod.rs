//! Provider adapters
//!
//! Each adapter translates between the gateway's unified schema and one
//! upstream wire dialect. Dispatch is a closed enum rather than trait
//! objects; the set of dialects is known at compile time.

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod sse;

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::BoxStream;

use crate::config::{ProviderSettings, UpstreamConfig};
use crate::core::catalog::ProviderId;
use crate::core::types::{ChatChunk, ChatCompletionRequest, FinishReason, UpstreamUsage};

pub use anthropic::AnthropicAdapter;
pub use error::ProviderError;
pub use openai::OpenAiCompatibleAdapter;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Unified stream of completion chunks from any provider
pub type ChunkStream = BoxStream<'static, Result<ChatChunk, ProviderError>>;

/// Outcome of a buffered upstream call, already translated into unified terms
#[derive(Debug, Clone)]
pub struct UpstreamCallResult {
    /// Full completion text
    pub content: String,
    /// Model name the upstream reported serving
    pub upstream_model: String,
    pub finish_reason: FinishReason,
    /// Usage as reported by the upstream, if any
    pub usage: Option<UpstreamUsage>,
}

/// One configured upstream
pub enum Provider {
    OpenAiCompatible(OpenAiCompatibleAdapter),
    Anthropic(AnthropicAdapter),
}

impl Provider {
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
        upstream_model: &str,
    ) -> Result<UpstreamCallResult, ProviderError> {
        match self {
            Provider::OpenAiCompatible(adapter) => adapter.complete(request, upstream_model).await,
            Provider::Anthropic(adapter) => adapter.complete(request, upstream_model).await,
        }
    }

    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        upstream_model: &str,
    ) -> Result<ChunkStream, ProviderError> {
        match self {
            Provider::OpenAiCompatible(adapter) => adapter.stream(request, upstream_model).await,
            Provider::Anthropic(adapter) => adapter.stream(request, upstream_model).await,
        }
    }
}

/// Registry of configured providers
///
/// A provider without a credential is simply absent; routing to it fails at
/// dispatch time, not at startup.
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Provider>,
}

impl ProviderRegistry {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        // One shared client; per-request deadlines are enforced by the router.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        let mut providers = HashMap::new();
        for (id, settings, default_base) in [
            (ProviderId::OpenAi, &config.openai, OPENAI_BASE_URL),
            (ProviderId::Anthropic, &config.anthropic, ANTHROPIC_BASE_URL),
            (ProviderId::Mistral, &config.mistral, MISTRAL_BASE_URL),
            (ProviderId::Groq, &config.groq, GROQ_BASE_URL),
        ] {
            if let Some(provider) = Self::build(id, settings, default_base, &client) {
                providers.insert(id, provider);
            }
        }
        Self { providers }
    }

    fn build(
        id: ProviderId,
        settings: &ProviderSettings,
        default_base: &str,
        client: &reqwest::Client,
    ) -> Option<Provider> {
        let api_key = settings.api_key.clone()?;
        let base_url = settings
            .api_base
            .clone()
            .unwrap_or_else(|| default_base.to_string());
        let provider = match id {
            ProviderId::Anthropic => {
                Provider::Anthropic(AnthropicAdapter::new(base_url, api_key, client.clone()))
            }
            _ => Provider::OpenAiCompatible(OpenAiCompatibleAdapter::new(
                id,
                base_url,
                api_key,
                client.clone(),
            )),
        };
        Some(provider)
    }

    pub fn get(&self, id: ProviderId) -> Option<&Provider> {
        self.providers.get(&id)
    }

    pub fn is_configured(&self, id: ProviderId) -> bool {
        self.providers.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_only_contains_configured_providers() {
        let config = UpstreamConfig {
            openai: ProviderSettings {
                api_key: Some("sk-test".to_string()),
                api_base: None,
            },
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.is_configured(ProviderId::OpenAi));
        assert!(!registry.is_configured(ProviderId::Anthropic));
        assert!(registry.get(ProviderId::Groq).is_none());
    }

    #[test]
    fn registry_honors_base_url_override() {
        let config = UpstreamConfig {
            groq: ProviderSettings {
                api_key: Some("gsk-test".to_string()),
                api_base: Some("http://localhost:9999/v1".to_string()),
            },
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.is_configured(ProviderId::Groq));
    }
}
