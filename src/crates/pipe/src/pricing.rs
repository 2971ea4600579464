use serde::{Deserialize, Serialize};

use crate::conversation::TokenCounts;

/// Models served by this pipe, in listing order.
pub const SUPPORTED_MODELS: [&str; 2] = ["o1-pro", "o3-pro"];

/// Whether a model id is one of [`SUPPORTED_MODELS`].
pub fn is_supported(model_id: &str) -> bool {
    SUPPORTED_MODELS.contains(&model_id)
}

/// Model pricing in USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
    /// Bill reasoning tokens again at the output rate
    pub bills_reasoning: bool,
}

impl ModelPricing {
    /// Calculate cost for a request
    pub fn calculate_cost(&self, tokens: TokenCounts) -> f64 {
        let input_cost = tokens.input as f64 / 1_000_000.0 * self.input_per_million;
        let output_cost = tokens.output as f64 / 1_000_000.0 * self.output_per_million;
        let reasoning_cost = if self.bills_reasoning && tokens.reasoning > 0 {
            tokens.reasoning as f64 / 1_000_000.0 * self.output_per_million
        } else {
            0.0
        };

        input_cost + output_cost + reasoning_cost
    }
}

/// Pricing for a supported model
pub fn pricing_for(model_id: &str) -> Option<ModelPricing> {
    match model_id {
        "o3-pro" => Some(ModelPricing {
            input_per_million: 20.0,
            output_per_million: 80.0,
            bills_reasoning: true,
        }),
        "o1-pro" => Some(ModelPricing {
            input_per_million: 150.0,
            output_per_million: 600.0,
            bills_reasoning: false,
        }),
        _ => None,
    }
}

/// Cost of one turn; unknown models are free
pub fn calculate_cost(model_id: &str, tokens: TokenCounts) -> f64 {
    pricing_for(model_id)
        .map(|pricing| pricing.calculate_cost(tokens))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: u64, output: u64, reasoning: u64) -> TokenCounts {
        TokenCounts {
            input,
            output,
            reasoning,
        }
    }

    #[test]
    fn test_o3_pro_million_tokens() {
        let cost = calculate_cost("o3-pro", tokens(1_000_000, 1_000_000, 0));
        assert!((cost - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_o3_pro_bills_reasoning_at_output_rate() {
        let cost = calculate_cost("o3-pro", tokens(0, 0, 500_000));
        assert!((cost - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_o1_pro_ignores_reasoning_tokens() {
        let with = calculate_cost("o1-pro", tokens(1_000, 2_000, 1_500));
        let without = calculate_cost("o1-pro", tokens(1_000, 2_000, 0));
        assert_eq!(with, without);
        assert!((with - (0.15 + 1.2)).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_is_free() {
        assert_eq!(calculate_cost("gpt-4", tokens(1_000_000, 1_000_000, 10)), 0.0);
        assert!(pricing_for("gpt-4").is_none());
    }

    #[test]
    fn test_supported_models() {
        assert!(is_supported("o1-pro"));
        assert!(is_supported("o3-pro"));
        assert!(!is_supported("o3"));
        for model in SUPPORTED_MODELS {
            assert!(pricing_for(model).is_some());
        }
    }
}
