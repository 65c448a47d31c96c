//! Confidence Scoring with Automatic Bonuses
//!
//! Summaries get a heuristic confidence from how the completion ended and
//! what was asked:
//! - natural stop (not cut off by the token limit)
//! - completion length above a threshold
//! - endpoint complexity (parameters, or more than one response)
//!
//! The result is always clamped into `[min_confidence, max_confidence]`.

use crate::ai::provider::CompletionResult;
use crate::constants::confidence as confidence_constants;
use crate::types::EndpointData;

/// Configuration for confidence scoring
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Score before bonuses
    pub base_score: f64,
    pub stop_bonus: f64,
    pub length_bonus: f64,
    /// Completion tokens above which `length_bonus` applies
    pub length_threshold: u32,
    pub complexity_bonus: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: confidence_constants::BASE,
            stop_bonus: confidence_constants::STOP_BONUS,
            length_bonus: confidence_constants::LENGTH_BONUS,
            length_threshold: confidence_constants::LENGTH_THRESHOLD,
            complexity_bonus: confidence_constants::COMPLEXITY_BONUS,
            min_confidence: 0.0,
            max_confidence: 1.0,
        }
    }
}

/// Score plus the bonuses that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScore {
    pub confidence: f64,
    pub bonuses: Vec<&'static str>,
}

/// Confidence scorer with bonus-based calculation
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score a summary completion for `endpoint`
    pub fn score(&self, completion: &CompletionResult, endpoint: &EndpointData) -> ConfidenceScore {
        self.score_parts(
            completion.finish_reason.is_stop(),
            completion.usage.completion_tokens,
            endpoint.is_complex(),
        )
    }

    pub fn score_parts(
        &self,
        stopped: bool,
        completion_tokens: u32,
        complex: bool,
    ) -> ConfidenceScore {
        let mut confidence = self.config.base_score;
        let mut bonuses = Vec::new();

        if stopped {
            confidence += self.config.stop_bonus;
            bonuses.push("natural_stop");
        }

        if completion_tokens > self.config.length_threshold {
            confidence += self.config.length_bonus;
            bonuses.push("substantial_output");
        }

        if complex {
            confidence += self.config.complexity_bonus;
            bonuses.push("complex_endpoint");
        }

        // NaN-safe clamp: a misconfigured NaN bonus falls back to the minimum
        let confidence = if confidence.is_nan() {
            self.config.min_confidence
        } else {
            confidence.clamp(self.config.min_confidence, self.config.max_confidence)
        };

        ConfidenceScore {
            confidence,
            bonuses,
        }
    }
}
