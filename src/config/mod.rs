//! Gateway configuration
//!
//! Loaded from a YAML file, then overlaid with environment variables so
//! credentials never have to live on disk. Every field has a default; a
//! missing config file is not an error.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bounded wait for one upstream call, in seconds
    pub timeout_secs: u64,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub mistral: ProviderSettings,
    pub groq: ProviderSettings,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            openai: ProviderSettings::default(),
            anthropic: ProviderSettings::default(),
            mistral: ProviderSettings::default(),
            groq: ProviderSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderSettings {
    /// Credential for the upstream; the provider is disabled without one
    pub api_key: Option<String>,
    /// Override for the upstream base URL
    pub api_base: Option<String>,
}

impl GatewayConfig {
    /// Settings block for one provider
    pub fn upstream_settings(&self, id: crate::core::catalog::ProviderId) -> &ProviderSettings {
        use crate::core::catalog::ProviderId;
        match id {
            ProviderId::OpenAi => &self.upstream.openai,
            ProviderId::Anthropic => &self.upstream.anthropic,
            ProviderId::Mistral => &self.upstream.mistral,
            ProviderId::Groq => &self.upstream.groq,
        }
    }

    /// Load from a YAML file, falling back to defaults when it is absent
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables win over file values
    fn apply_env_overrides(&mut self) {
        let overrides = [
            (&mut self.upstream.openai, "OPENAI"),
            (&mut self.upstream.anthropic, "ANTHROPIC"),
            (&mut self.upstream.mistral, "MISTRAL"),
            (&mut self.upstream.groq, "GROQ"),
        ];
        for (settings, prefix) in overrides {
            if let Ok(key) = std::env::var(format!("{prefix}_API_KEY")) {
                settings.api_key = Some(key);
            }
            if let Ok(base) = std::env::var(format!("{prefix}_API_BASE")) {
                settings.api_base = Some(base);
            }
        }
        if let Ok(host) = std::env::var("GATEWAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("GATEWAY_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(timeout) = std::env::var("UPSTREAM_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse() {
                self.upstream.timeout_secs = timeout;
            }
        }
    }
}
