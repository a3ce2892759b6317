//! Per-request accounting
//!
//! Collects whatever is known about a request at its terminal moment
//! (explicit usage, captured text, error) and turns it into exactly one
//! activity log attempt. Log failures are logged and swallowed; accounting
//! must never change the client-visible outcome.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::warn;

use crate::core::catalog::ProviderId;
use crate::core::cost::{self, CostBreakdown};
use crate::core::tokenizer::RawContent;
use crate::core::types::{
    ChatChunk, ChatCompletionRequest, FinishReason, RequestContext, UpstreamUsage,
};
use crate::storage::{ActivityLogEntry, ActivityLogStore};
use crate::utils::GatewayError;

pub struct Accounting {
    store: Arc<dyn ActivityLogStore>,
    request_id: String,
    project_id: Option<String>,
    api_key_id: Option<String>,
    requested_model: String,
    provider: Option<ProviderId>,
    upstream_model: Option<String>,
    messages: Vec<crate::core::types::ChatMessage>,
    started: Instant,
}

impl Accounting {
    pub fn new(
        store: Arc<dyn ActivityLogStore>,
        context: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Self {
        Self {
            store,
            request_id: context.request_id.clone(),
            project_id: context.project_id.clone(),
            api_key_id: context.api_key_id.clone(),
            requested_model: request.model.clone(),
            provider: None,
            upstream_model: None,
            messages: request.messages.clone(),
            started: Instant::now(),
        }
    }

    /// Note which provider the request was dispatched to
    pub fn dispatched(&mut self, provider: ProviderId) {
        self.provider = Some(provider);
    }

    /// Note the model name the upstream reported serving
    pub fn served_by(&mut self, upstream_model: &str) {
        self.upstream_model = Some(upstream_model.to_string());
    }

    fn build_entry(
        &self,
        finish_reason: FinishReason,
        usage: Option<UpstreamUsage>,
        completion: Option<&str>,
        error: Option<String>,
    ) -> (ActivityLogEntry, CostBreakdown) {
        let mut raw = RawContent::from_messages(&self.messages);
        if let Some(completion) = completion {
            raw = raw.with_completion(completion);
        }
        let usage = usage.unwrap_or_default();
        let breakdown = cost::calculate_costs(
            &self.requested_model,
            usage.prompt_tokens,
            usage.completion_tokens,
            &raw,
        );
        let entry = ActivityLogEntry {
            id: self.request_id.clone(),
            project_id: self.project_id.clone(),
            api_key_id: self.api_key_id.clone(),
            requested_model: self.requested_model.clone(),
            provider: self.provider,
            upstream_model: self.upstream_model.clone(),
            prompt_tokens: breakdown.prompt_tokens,
            completion_tokens: breakdown.completion_tokens,
            input_cost: breakdown.input_cost,
            output_cost: breakdown.output_cost,
            total_cost: breakdown.total_cost,
            duration_ms: self.started.elapsed().as_millis() as u64,
            finish_reason,
            error,
            created_at: Utc::now(),
        };
        (entry, breakdown)
    }

    /// Record the terminal outcome, awaiting the insert
    pub async fn record(
        self,
        finish_reason: FinishReason,
        usage: Option<UpstreamUsage>,
        completion: Option<&str>,
        error: Option<String>,
    ) -> CostBreakdown {
        let (entry, breakdown) = self.build_entry(finish_reason, usage, completion, error);
        let id = entry.id.clone();
        if let Err(e) = self.store.insert_log(entry).await {
            warn!(request_id = %id, error = %e, "failed to persist activity log entry");
        }
        breakdown
    }

    /// Record without awaiting; used from Drop where awaiting is impossible
    pub fn record_detached(
        self,
        finish_reason: FinishReason,
        usage: Option<UpstreamUsage>,
        completion: Option<&str>,
        error: Option<String>,
    ) {
        let (entry, _) = self.build_entry(finish_reason, usage, completion, error);
        let id = entry.id.clone();
        let store = Arc::clone(&self.store);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.insert_log(entry).await {
                        warn!(request_id = %id, error = %e, "failed to persist activity log entry");
                    }
                });
            }
            Err(_) => {
                warn!(request_id = %id, "no runtime available, dropping activity log entry");
            }
        }
    }
}

/// Drop-guard accounting for a relayed stream
///
/// Observes every chunk as it passes through. If the guard is dropped before
/// `finish` or `fail` is called the client disconnected mid-stream, and the
/// partial work is recorded with a `cancelled` finish reason.
pub struct StreamAccounting {
    inner: Option<Accounting>,
    content: String,
    usage: UpstreamUsage,
    finish_reason: Option<FinishReason>,
}

impl StreamAccounting {
    pub fn new(accounting: Accounting) -> Self {
        Self {
            inner: Some(accounting),
            content: String::new(),
            usage: UpstreamUsage::default(),
            finish_reason: None,
        }
    }

    /// Accumulate content, usage and the finish reason from one chunk
    pub fn observe(&mut self, chunk: &ChatChunk) {
        if let Some(content) = chunk.content() {
            self.content.push_str(content);
        }
        if let Some(usage) = &chunk.usage {
            self.usage.merge(usage);
        }
        if let Some(reason) = chunk.finish_reason() {
            self.finish_reason = Some(reason);
        }
    }

    pub fn served_by(&mut self, upstream_model: &str) {
        if let Some(inner) = self.inner.as_mut() {
            if inner.upstream_model.is_none() && !upstream_model.is_empty() {
                inner.served_by(upstream_model);
            }
        }
    }

    /// Record a cleanly finished stream
    pub async fn finish(mut self) {
        if let Some(inner) = self.inner.take() {
            let reason = self.finish_reason.unwrap_or(FinishReason::Stop);
            inner
                .record(reason, Some(self.usage), Some(&self.content), None)
                .await;
        }
    }

    /// Record a stream that failed mid-flight
    pub async fn fail(mut self, error: &GatewayError) {
        if let Some(inner) = self.inner.take() {
            let reason = match error {
                GatewayError::Timeout => FinishReason::Timeout,
                _ => FinishReason::Error,
            };
            inner
                .record(
                    reason,
                    Some(self.usage),
                    Some(&self.content),
                    Some(error.to_string()),
                )
                .await;
        }
    }
}

impl Drop for StreamAccounting {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            let usage = self.usage;
            let content = std::mem::take(&mut self.content);
            inner.record_detached(
                FinishReason::Cancelled,
                Some(usage),
                Some(&content),
                None,
            );
        }
    }
}
