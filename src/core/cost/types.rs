//! Cost accounting types

use serde::{Deserialize, Serialize};

/// Cost and token breakdown for one request
///
/// Every field is nullable. A null cost means "unknown", which is a distinct
/// and meaningful state for billing: zero would silently claim the request
/// was free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Cost of prompt tokens (USD)
    pub input_cost: Option<f64>,
    /// Cost of completion tokens (USD)
    pub output_cost: Option<f64>,
    /// Total cost (USD)
    pub total_cost: Option<f64>,
    /// Prompt token count used for pricing
    pub prompt_tokens: Option<u32>,
    /// Completion token count used for pricing
    pub completion_tokens: Option<u32>,
}

impl CostBreakdown {
    /// Breakdown with known token counts but no price data
    pub fn unpriced(prompt_tokens: Option<u32>, completion_tokens: Option<u32>) -> Self {
        Self {
            input_cost: None,
            output_cost: None,
            total_cost: None,
            prompt_tokens,
            completion_tokens,
        }
    }
}
