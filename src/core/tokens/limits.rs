//! Context window limits and per-token pricing for common model families

use super::counter::TokenCounter;
use super::types::TokenError;
use serde::{Deserialize, Serialize};

/// Context window limits for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLimits {
    /// Maximum input + output tokens
    pub context_window: usize,
    /// Maximum tokens the model may generate
    pub max_output_tokens: usize,
}

/// USD price per 1K tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

struct FamilyEntry {
    family: &'static str,
    limits: ModelLimits,
    price: ModelPrice,
}

const fn entry(
    family: &'static str,
    context_window: usize,
    max_output_tokens: usize,
    input_per_1k: f64,
    output_per_1k: f64,
) -> FamilyEntry {
    FamilyEntry {
        family,
        limits: ModelLimits {
            context_window,
            max_output_tokens,
        },
        price: ModelPrice {
            input_per_1k,
            output_per_1k,
        },
    }
}

// Longest prefixes first: the first match wins.
static FAMILIES: &[FamilyEntry] = &[
    entry("gpt-4o-mini", 128_000, 16_384, 0.000_15, 0.000_6),
    entry("gpt-4o", 128_000, 16_384, 0.002_5, 0.01),
    entry("gpt-4-turbo", 128_000, 4_096, 0.01, 0.03),
    entry("gpt-4-32k", 32_768, 4_096, 0.06, 0.12),
    entry("gpt-4", 8_192, 4_096, 0.03, 0.06),
    entry("gpt-3.5-turbo-16k", 16_384, 4_096, 0.003, 0.004),
    entry("gpt-3.5-turbo", 4_096, 4_096, 0.001, 0.002),
    entry("claude-3-opus", 200_000, 4_096, 0.015, 0.075),
    entry("claude-3-sonnet", 200_000, 4_096, 0.003, 0.015),
    entry("claude-3-haiku", 200_000, 4_096, 0.000_25, 0.001_25),
];

/// Used for models outside the table (gpt-3.5-turbo pricing and window)
static DEFAULT_FAMILY: FamilyEntry = entry("default", 4_096, 4_096, 0.001, 0.002);

/// Strip a provider prefix and match the model against the family table
fn family_for(model: &str) -> &'static FamilyEntry {
    let model = model.rsplit_once('/').map(|(_, m)| m).unwrap_or(model);

    FAMILIES
        .iter()
        .find(|entry| model.starts_with(entry.family))
        .unwrap_or(&DEFAULT_FAMILY)
}

impl TokenCounter {
    /// Context window limits for a model
    pub fn get_model_limits(&self, model: &str) -> ModelLimits {
        family_for(model).limits
    }

    /// Per-1K token prices for a model
    pub fn get_model_price(&self, model: &str) -> ModelPrice {
        family_for(model).price
    }

    /// Estimate the USD cost of a call
    pub fn estimate_cost(&self, input_tokens: usize, output_tokens: usize, model: &str) -> f64 {
        let price = family_for(model).price;
        (input_tokens as f64 / 1000.0) * price.input_per_1k
            + (output_tokens as f64 / 1000.0) * price.output_per_1k
    }

    /// Count `text` and check it against the model's context window
    ///
    /// Returns the token count when it fits. Counting needs a tokenizer for
    /// `model`, so models that only have a limits entry (the `claude-*`
    /// family) fail with [`TokenError::ModelNotSupported`] even though
    /// [`get_model_limits`](Self::get_model_limits) knows their window.
    pub fn validate_input(&self, text: &str, model: &str) -> Result<usize, TokenError> {
        let tokens = self.count_tokens(text, model)?;
        let limit = self.get_model_limits(model).context_window;

        if tokens > limit {
            return Err(TokenError::ContextWindowExceeded {
                model: model.to_string(),
                tokens,
                limit,
            });
        }

        Ok(tokens)
    }
}
