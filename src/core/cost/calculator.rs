//! Cost calculation
//!
//! Pure arithmetic over catalog prices and token counts. No I/O, no clock,
//! no mutation: identical inputs always produce identical outputs. Raw f64
//! products are returned without rounding; display formatting is the
//! consumer's concern.

use crate::core::catalog::{self, ProviderMapping};
use crate::core::tokenizer::{self, RawContent};

use super::types::CostBreakdown;

/// Price one request against a specific provider mapping
///
/// If either token count is null the cost side of the breakdown is entirely
/// null: a partial figure would be misleading rather than conservative. A
/// missing price for a dimension likewise nulls that dimension and the total.
pub fn calculate_cost_for_mapping(
    mapping: &ProviderMapping,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
) -> CostBreakdown {
    let (Some(prompt), Some(completion)) = (prompt_tokens, completion_tokens) else {
        return CostBreakdown::unpriced(prompt_tokens, completion_tokens);
    };

    let input_cost = mapping.input_price.map(|price| price * prompt as f64);
    let output_cost = mapping.output_price.map(|price| price * completion as f64);
    let total_cost = match (input_cost, output_cost) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };

    CostBreakdown {
        input_cost,
        output_cost,
        total_cost,
        prompt_tokens: Some(prompt),
        completion_tokens: Some(completion),
    }
}

/// Price one request against a logical model's default mapping
///
/// An unknown model yields null costs with the token counts passed through
/// untouched, so usage data survives even when pricing cannot be resolved.
pub fn calculate_cost(
    model: &str,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
) -> CostBreakdown {
    match catalog::find_model(model) {
        Some(definition) => {
            calculate_cost_for_mapping(definition.default_mapping(), prompt_tokens, completion_tokens)
        }
        None => CostBreakdown::unpriced(prompt_tokens, completion_tokens),
    }
}

/// Estimate tokens then price them, in one step
///
/// This is the accounting entry point used per request: explicit upstream
/// counts win, text-derived counts fill the gaps, and whatever remains null
/// propagates into the cost side.
pub fn calculate_costs(
    model: &str,
    explicit_prompt: Option<u32>,
    explicit_completion: Option<u32>,
    raw: &RawContent,
) -> CostBreakdown {
    let estimate = tokenizer::estimate(model, explicit_prompt, explicit_completion, raw);
    calculate_cost(model, estimate.prompt_tokens, estimate.completion_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChatMessage;

    const EPSILON: f64 = 1e-12;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a cost");
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn gpt4_cost_is_exact() {
        let breakdown = calculate_cost("gpt-4", Some(100), Some(50));
        assert_close(breakdown.input_cost, 0.001);
        assert_close(breakdown.output_cost, 0.0015);
        assert_close(breakdown.total_cost, 0.0025);
        assert_eq!(breakdown.prompt_tokens, Some(100));
        assert_eq!(breakdown.completion_tokens, Some(50));
    }

    #[test]
    fn null_prompt_tokens_null_all_costs() {
        let breakdown = calculate_cost("gpt-4", None, Some(50));
        assert_eq!(breakdown.input_cost, None);
        assert_eq!(breakdown.output_cost, None);
        assert_eq!(breakdown.total_cost, None);
        assert_eq!(breakdown.prompt_tokens, None);
        assert_eq!(breakdown.completion_tokens, Some(50));
    }

    #[test]
    fn null_completion_tokens_null_all_costs() {
        let breakdown = calculate_cost("gpt-4", Some(100), None);
        assert_eq!(breakdown.input_cost, None);
        assert_eq!(breakdown.output_cost, None);
        assert_eq!(breakdown.total_cost, None);
        assert_eq!(breakdown.prompt_tokens, Some(100));
    }

    #[test]
    fn unknown_model_passes_tokens_through() {
        let breakdown = calculate_cost("not-a-model", Some(10), Some(20));
        assert_eq!(breakdown.input_cost, None);
        assert_eq!(breakdown.output_cost, None);
        assert_eq!(breakdown.total_cost, None);
        assert_eq!(breakdown.prompt_tokens, Some(10));
        assert_eq!(breakdown.completion_tokens, Some(20));
    }

    #[test]
    fn unpriced_model_keeps_tokens_and_nulls_costs() {
        let breakdown = calculate_cost("llama-3.1-405b", Some(100), Some(50));
        assert_eq!(breakdown.input_cost, None);
        assert_eq!(breakdown.output_cost, None);
        assert_eq!(breakdown.total_cost, None);
        assert_eq!(breakdown.prompt_tokens, Some(100));
        assert_eq!(breakdown.completion_tokens, Some(50));
    }

    #[test]
    fn zero_tokens_cost_zero_not_null() {
        let breakdown = calculate_cost("gpt-4", Some(0), Some(0));
        assert_eq!(breakdown.input_cost, Some(0.0));
        assert_eq!(breakdown.output_cost, Some(0.0));
        assert_eq!(breakdown.total_cost, Some(0.0));
    }

    #[test]
    fn calculation_is_deterministic() {
        let a = calculate_cost("gpt-4", Some(123), Some(456));
        let b = calculate_cost("gpt-4", Some(123), Some(456));
        assert_eq!(a, b);
    }

    #[test]
    fn estimate_then_price_uses_explicit_counts() {
        let raw = RawContent::from_messages(&[ChatMessage::user("hello")])
            .with_completion("hi");
        let breakdown = calculate_costs("gpt-4", Some(100), Some(50), &raw);
        assert_close(breakdown.total_cost, 0.0025);
    }

    #[test]
    fn estimate_then_price_falls_back_to_text() {
        let raw = RawContent::from_messages(&[ChatMessage::user("hello world")])
            .with_completion("hi there");
        let breakdown = calculate_costs("gpt-4", None, None, &raw);
        assert!(breakdown.prompt_tokens.is_some());
        assert!(breakdown.completion_tokens.is_some());
        assert!(breakdown.total_cost.is_some());
    }

    #[test]
    fn flat_text_fallback_produces_positive_costs() {
        let raw = RawContent {
            prompt: Some("what is the capital of france".to_string()),
            completion: Some("the capital of france is paris".to_string()),
            messages: None,
        };
        let breakdown = calculate_costs("gpt-4", None, None, &raw);
        assert!(breakdown.prompt_tokens.unwrap() > 0);
        assert!(breakdown.completion_tokens.unwrap() > 0);
        assert!(breakdown.input_cost.unwrap() > 0.0);
        assert!(breakdown.output_cost.unwrap() > 0.0);
        assert!(breakdown.total_cost.unwrap() > 0.0);
    }

    #[test]
    fn estimate_without_any_source_stays_null() {
        let breakdown = calculate_costs("gpt-4", None, None, &RawContent::default());
        assert_eq!(breakdown.prompt_tokens, None);
        assert_eq!(breakdown.total_cost, None);
    }
}
