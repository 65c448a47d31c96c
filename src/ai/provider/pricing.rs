//! Per-model token pricing.
//!
//! Costs are in USD per 1K tokens. Lookup matches the longest known model
//! prefix so dated variants (`gpt-4o-2024-08-06`) resolve to their family.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Cost per 1K prompt tokens (USD)
    pub prompt_per_1k: f64,
    /// Cost per 1K completion tokens (USD)
    pub completion_per_1k: f64,
}

/// Known model families, most specific prefix first within each family
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("gpt-4o-mini", ModelPricing::new(0.000_15, 0.000_6)),
    ("gpt-4o", ModelPricing::new(0.002_5, 0.01)),
    ("gpt-4-turbo", ModelPricing::new(0.01, 0.03)),
    ("gpt-4", ModelPricing::new(0.03, 0.06)),
    ("gpt-3.5-turbo", ModelPricing::new(0.000_5, 0.001_5)),
    ("claude-3-5-sonnet", ModelPricing::new(0.003, 0.015)),
    ("claude-3-haiku", ModelPricing::new(0.000_25, 0.001_25)),
];

impl ModelPricing {
    pub const fn new(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self {
            prompt_per_1k,
            completion_per_1k,
        }
    }

    /// Free (local models, mocks, unknown models)
    pub const fn free() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Pricing for `model`; unknown models are free
    pub fn for_model(model: &str) -> Self {
        let model = model.to_lowercase();
        PRICING_TABLE
            .iter()
            .filter(|(prefix, _)| model.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, pricing)| *pricing)
            .unwrap_or_else(Self::free)
    }

    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.prompt_per_1k
            + (completion_tokens as f64 / 1000.0) * self.completion_per_1k
    }
}
