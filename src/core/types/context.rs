//! Per-request context
//!
//! Identity fields arrive already resolved by the authentication collaborator
//! (the gateway does not validate credentials itself); they are carried
//! through to the activity log record.

use uuid::Uuid;

/// Context accompanying one inbound request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Gateway-assigned request identifier, also used as the response id
    pub request_id: String,
    /// Resolved project identifier, if any
    pub project_id: Option<String>,
    /// Resolved API key identifier, if any
    pub api_key_id: Option<String>,
}

impl RequestContext {
    pub fn new(project_id: Option<String>, api_key_id: Option<String>) -> Self {
        Self {
            request_id: format!("chatcmpl-{}", Uuid::new_v4()),
            project_id,
            api_key_id,
        }
    }

    /// Anonymous context (no resolved identity)
    pub fn anonymous() -> Self {
        Self::new(None, None)
    }
}
