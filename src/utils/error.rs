//! Gateway error type and HTTP mapping

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::catalog::ProviderId;
use crate::core::providers::ProviderError;

/// JSON error body returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Top-level gateway error
///
/// Validation failures are client errors and must never reach an upstream;
/// upstream failures map to 502 and the bounded-wait expiry to 504.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("{0}")]
    Validation(String),

    #[error("model {0} does not support streaming")]
    StreamingUnsupported(String),

    #[error("provider {0} is not configured")]
    ProviderNotConfigured(ProviderId),

    #[error("upstream error from {provider}: {message}")]
    Upstream {
        provider: ProviderId,
        status: u16,
        message: String,
    },

    #[error("failed to parse {provider} response: {message}")]
    Parse {
        provider: ProviderId,
        message: String,
    },

    #[error("network error reaching {provider}: {message}")]
    Network {
        provider: ProviderId,
        message: String,
    },

    #[error("upstream request timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProviderError> for GatewayError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Upstream {
                provider,
                status,
                message,
            } => GatewayError::Upstream {
                provider,
                status,
                message,
            },
            ProviderError::Parse { provider, message } => {
                GatewayError::Parse { provider, message }
            }
            ProviderError::Network { provider, message } => {
                GatewayError::Network { provider, message }
            }
            ProviderError::StreamingUnsupported { model } => {
                GatewayError::StreamingUnsupported(model)
            }
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownModel(_)
            | GatewayError::Validation(_)
            | GatewayError::StreamingUnsupported(_) => StatusCode::BAD_REQUEST,
            GatewayError::ProviderNotConfigured(_)
            | GatewayError::Upstream { .. }
            | GatewayError::Parse { .. }
            | GatewayError::Network { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            GatewayError::UnknownModel("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::StreamingUnsupported("o1-mini".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Upstream {
                provider: ProviderId::OpenAi,
                status: 500,
                message: "boom".into(),
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::Timeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn error_body_is_message_only() {
        let response = GatewayError::UnknownModel("nope".into()).error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_error_conversion_preserves_kind() {
        let e: GatewayError =
            ProviderError::parse(ProviderId::Anthropic, "bad json").into();
        assert!(matches!(e, GatewayError::Parse { .. }));
    }
}
