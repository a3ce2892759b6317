//! Request routing and orchestration
//!
//! A request moves through validation, dispatch, relay and accounting.
//! Validation happens entirely against the local catalog, so a request that
//! fails it never reaches an upstream. Every terminal outcome, including
//! cancellation and timeout, yields exactly one activity log attempt.

pub mod accounting;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info};

use crate::core::catalog::{self, ModelDefinition, ProviderMapping};
use crate::core::providers::{Provider, ProviderRegistry};
use crate::core::types::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, FinishReason,
    RequestContext, Usage,
};
use crate::storage::ActivityLogStore;
use crate::utils::GatewayError;

pub use accounting::{Accounting, StreamAccounting};

pub struct RequestRouter {
    registry: ProviderRegistry,
    log_store: Arc<dyn ActivityLogStore>,
    upstream_timeout: Duration,
}

impl RequestRouter {
    pub fn new(
        registry: ProviderRegistry,
        log_store: Arc<dyn ActivityLogStore>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            log_store,
            upstream_timeout,
        }
    }

    /// Resolve and validate a request against the catalog
    ///
    /// Unknown model, empty messages and unsupported streaming are all
    /// rejected here, before any upstream work.
    fn validate(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<(&'static ModelDefinition, &'static ProviderMapping), GatewayError> {
        let definition = catalog::find_model(&request.model)
            .ok_or_else(|| GatewayError::UnknownModel(request.model.clone()))?;
        if request.messages.is_empty() {
            return Err(GatewayError::Validation(
                "messages must not be empty".to_string(),
            ));
        }
        let mapping = definition.default_mapping();
        if request.stream && !mapping.supports_streaming {
            return Err(GatewayError::StreamingUnsupported(request.model.clone()));
        }
        Ok((definition, mapping))
    }

    fn provider_for(
        &self,
        mapping: &ProviderMapping,
    ) -> Result<&Provider, GatewayError> {
        self.registry
            .get(mapping.provider)
            .ok_or(GatewayError::ProviderNotConfigured(mapping.provider))
    }

    async fn reject(
        &self,
        request: &ChatCompletionRequest,
        context: &RequestContext,
        error: GatewayError,
    ) -> GatewayError {
        let accounting = Accounting::new(Arc::clone(&self.log_store), context, request);
        accounting
            .record(FinishReason::Error, None, None, Some(error.to_string()))
            .await;
        error
    }

    /// Buffered (non-streaming) completion
    pub async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
        context: RequestContext,
    ) -> Result<ChatCompletionResponse, GatewayError> {
        let (definition, mapping) = match self.validate(&request) {
            Ok(resolved) => resolved,
            Err(e) => return Err(self.reject(&request, &context, e).await),
        };
        let provider = match self.provider_for(mapping) {
            Ok(provider) => provider,
            Err(e) => return Err(self.reject(&request, &context, e).await),
        };

        let mut accounting = Accounting::new(Arc::clone(&self.log_store), &context, &request);
        accounting.dispatched(mapping.provider);
        debug!(
            request_id = %context.request_id,
            model = %definition.id,
            provider = %mapping.provider,
            "dispatching buffered completion"
        );

        let outcome = tokio::time::timeout(
            self.upstream_timeout,
            provider.complete(&request, mapping.upstream_model),
        )
        .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(provider_error)) => {
                let error: GatewayError = provider_error.into();
                accounting
                    .record(FinishReason::Error, None, None, Some(error.to_string()))
                    .await;
                return Err(error);
            }
            Err(_elapsed) => {
                let error = GatewayError::Timeout;
                accounting
                    .record(FinishReason::Timeout, None, None, Some(error.to_string()))
                    .await;
                return Err(error);
            }
        };

        accounting.served_by(&result.upstream_model);
        let breakdown = accounting
            .record(
                result.finish_reason,
                result.usage,
                Some(&result.content),
                None,
            )
            .await;

        let usage = match (breakdown.prompt_tokens, breakdown.completion_tokens) {
            (Some(prompt), Some(completion)) => Some(Usage::new(prompt, completion)),
            _ => None,
        };

        info!(
            request_id = %context.request_id,
            model = %request.model,
            finish_reason = result.finish_reason.as_str(),
            "completed buffered request"
        );

        Ok(ChatCompletionResponse {
            id: context.request_id,
            object: "chat.completion".to_string(),
            created: Utc::now().timestamp(),
            model: request.model,
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(result.content),
                finish_reason: Some(result.finish_reason),
            }],
            usage,
        })
    }

    /// Streaming completion
    ///
    /// Chunks are relayed as SSE frames with the gateway's id and logical
    /// model name substituted. Accounting happens once the relay ends, in
    /// whatever way it ends: a drop of the returned stream before completion
    /// is treated as client cancellation.
    pub async fn chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
        context: RequestContext,
    ) -> Result<BoxStream<'static, Result<Bytes, GatewayError>>, GatewayError> {
        let (_definition, mapping) = match self.validate(&request) {
            Ok(resolved) => resolved,
            Err(e) => return Err(self.reject(&request, &context, e).await),
        };
        let provider = match self.provider_for(mapping) {
            Ok(provider) => provider,
            Err(e) => return Err(self.reject(&request, &context, e).await),
        };

        let mut accounting = Accounting::new(Arc::clone(&self.log_store), &context, &request);
        accounting.dispatched(mapping.provider);
        debug!(
            request_id = %context.request_id,
            model = %request.model,
            provider = %mapping.provider,
            "dispatching streaming completion"
        );

        let dialed = tokio::time::timeout(
            self.upstream_timeout,
            provider.stream(&request, mapping.upstream_model),
        )
        .await;

        let mut upstream = match dialed {
            Ok(Ok(stream)) => stream,
            Ok(Err(provider_error)) => {
                let error: GatewayError = provider_error.into();
                accounting
                    .record(FinishReason::Error, None, None, Some(error.to_string()))
                    .await;
                return Err(error);
            }
            Err(_elapsed) => {
                let error = GatewayError::Timeout;
                accounting
                    .record(FinishReason::Timeout, None, None, Some(error.to_string()))
                    .await;
                return Err(error);
            }
        };

        let request_id = context.request_id.clone();
        let model = request.model.clone();
        let created = Utc::now().timestamp();
        let mut guard = StreamAccounting::new(accounting);

        let stream = async_stream::stream! {
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(mut chunk) => {
                        guard.observe(&chunk);
                        guard.served_by(&chunk.model);
                        // The client sees the gateway's identity, not the
                        // upstream's.
                        chunk.id = request_id.clone();
                        chunk.model = model.clone();
                        chunk.created = created;
                        match serde_json::to_string(&chunk) {
                            Ok(json) => {
                                yield Ok(Bytes::from(format!("data: {json}\n\n")));
                            }
                            Err(e) => {
                                let error = GatewayError::Internal(e.to_string());
                                guard.fail(&error).await;
                                yield Err(error);
                                return;
                            }
                        }
                    }
                    Err(provider_error) => {
                        let error: GatewayError = provider_error.into();
                        guard.fail(&error).await;
                        yield Err(error);
                        return;
                    }
                }
            }
            guard.finish().await;
            yield Ok(Bytes::from_static(b"data: [DONE]\n\n"));
        };

        Ok(stream.boxed())
    }
}
