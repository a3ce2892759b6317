//! Activity log storage
//!
//! One record per terminal request outcome. Persistence is fire-and-forget
//! from the router's point of view: a failed insert is logged and dropped,
//! never surfaced to the client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::catalog::ProviderId;
use crate::core::types::FinishReason;

/// One accounting record for a completed, failed or cancelled request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// Gateway request identifier
    pub id: String,
    pub project_id: Option<String>,
    pub api_key_id: Option<String>,
    /// Logical model name as requested by the client
    pub requested_model: String,
    /// Provider the request was dispatched to, absent when it never left
    pub provider: Option<ProviderId>,
    /// Model name the provider reported serving
    pub upstream_model: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub input_cost: Option<f64>,
    pub output_cost: Option<f64>,
    pub total_cost: Option<f64>,
    /// Wall-clock duration of the request in milliseconds
    pub duration_ms: u64,
    pub finish_reason: FinishReason,
    /// Error message for failed requests
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sink for activity log records
#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    async fn insert_log(&self, entry: ActivityLogEntry) -> anyhow::Result<()>;
}

/// In-memory store, used in tests and single-process deployments
#[derive(Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<ActivityLogEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries, oldest first
    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl ActivityLogStore for MemoryLogStore {
    async fn insert_log(&self, entry: ActivityLogEntry) -> anyhow::Result<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}
