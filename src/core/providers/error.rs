//! Provider error types

use thiserror::Error;

use crate::core::catalog::ProviderId;

/// Errors surfaced by provider adapters
///
/// Upstream HTTP failures and malformed payloads are distinct variants so
/// the router can log and map them to different client responses.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Upstream returned a non-success status
    #[error("{provider} returned {status}: {message}")]
    Upstream {
        provider: ProviderId,
        status: u16,
        message: String,
    },

    /// Upstream payload could not be interpreted
    #[error("{provider} response parsing failed: {message}")]
    Parse {
        provider: ProviderId,
        message: String,
    },

    /// Transport-level failure talking to the upstream
    #[error("{provider} network error: {message}")]
    Network {
        provider: ProviderId,
        message: String,
    },

    /// Model mapping does not support streaming
    #[error("model {model} does not support streaming")]
    StreamingUnsupported { model: String },
}

impl ProviderError {
    pub fn upstream(provider: ProviderId, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn parse(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::Parse {
            provider,
            message: message.into(),
        }
    }

    pub fn network(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::Network {
            provider,
            message: message.into(),
        }
    }
}
