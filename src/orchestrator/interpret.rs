//! Turns parsed model output into operation payloads.
//!
//! Each interpreter handles both [`ParsedOutput`] arms. Structured output is
//! read leniently (camelCase or snake_case keys, missing fields defaulted);
//! heuristic output is read from labeled sections and bullets.

use serde_json::Value;

use crate::ai::ParsedOutput;
use crate::ai::parse::Sections;
use crate::constants::operation as op_constants;
use crate::types::{
    Enhancement, EnhancementType, EndpointSummary, FeedbackSeverity, ValidationFeedback,
    ValidationMetrics, json_bool, json_f64, json_string, json_string_array,
};

/// First string found under any of `keys`
fn string_at(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| json_string(value, key))
        .find(|s| !s.trim().is_empty())
}

fn array_at(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .map(|key| json_string_array(value, key))
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Summarize
// =============================================================================

pub(crate) fn summary(parsed: &ParsedOutput, raw: &str) -> EndpointSummary {
    match parsed {
        ParsedOutput::Structured(value) => {
            let description = string_at(value, &["description"]).unwrap_or_default();
            let summary = string_at(value, &["summary"])
                .unwrap_or_else(|| {
                    first_line(if description.is_empty() {
                        raw
                    } else {
                        description.as_str()
                    })
                });
            EndpointSummary {
                summary,
                description,
                key_points: array_at(value, &["keyPoints", "key_points"]),
                use_cases: array_at(value, &["useCases", "use_cases"]),
                example: string_at(value, &["example"]),
            }
        }
        ParsedOutput::Heuristic(sections) => heuristic_summary(sections, raw),
    }
}

fn heuristic_summary(sections: &Sections, raw: &str) -> EndpointSummary {
    let summary = sections
        .text(&["summary", "overview"])
        .or_else(|| Some(sections.preamble().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| first_line(raw));

    let description = sections
        .text(&["description", "details"])
        .unwrap_or_else(|| raw.trim().to_string());

    let mut key_points = sections.items(&["key points", "highlights"]);
    if key_points.is_empty() && sections.labels().next().is_none() {
        // Unlabeled bullet list: treat every bullet as a key point
        key_points = sections.bullets().to_vec();
    }

    EndpointSummary {
        summary,
        description,
        key_points,
        use_cases: sections.items(&["use cases"]),
        example: sections.text(&["example"]),
    }
}

// =============================================================================
// Enhance
// =============================================================================

pub(crate) struct EnhanceOutcome {
    pub enhanced_content: String,
    pub enhancements: Vec<Enhancement>,
}

pub(crate) fn enhancement(parsed: &ParsedOutput, raw: &str, original: &str) -> EnhanceOutcome {
    match parsed {
        ParsedOutput::Structured(value) => {
            let enhanced_content = string_at(value, &["enhancedContent", "enhanced_content"])
                .unwrap_or_else(|| original.to_string());

            match value.get("enhancements").and_then(Value::as_array) {
                Some(items) => EnhanceOutcome {
                    enhanced_content,
                    enhancements: items.iter().filter_map(parse_enhancement).collect(),
                },
                None => EnhanceOutcome {
                    enhancements: vec![synthetic_addition(&enhanced_content)],
                    enhanced_content,
                },
            }
        }
        ParsedOutput::Heuristic(sections) => {
            let enhanced_content = sections
                .text(&["enhanced content", "improved content"])
                .unwrap_or_else(|| raw.trim().to_string());
            EnhanceOutcome {
                enhanced_content,
                enhancements: vec![synthetic_addition(raw.trim())],
            }
        }
    }
}

fn parse_enhancement(item: &Value) -> Option<Enhancement> {
    if let Ok(enhancement) = serde_json::from_value::<Enhancement>(item.clone()) {
        return Some(enhancement);
    }
    // Plain string suggestions are additions
    item.as_str().map(|text| Enhancement {
        kind: EnhancementType::Addition,
        section: None,
        original: None,
        suggested: text.to_string(),
        reason: String::new(),
        confidence: op_constants::FALLBACK_ENHANCEMENT_CONFIDENCE,
    })
}

/// Single addition wrapping text the model did not structure
fn synthetic_addition(text: &str) -> Enhancement {
    Enhancement {
        kind: EnhancementType::Addition,
        section: None,
        original: None,
        suggested: text.to_string(),
        reason: "Model output was not structured; returned as a single suggestion".to_string(),
        confidence: op_constants::FALLBACK_ENHANCEMENT_CONFIDENCE,
    }
}

// =============================================================================
// Validate
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidateOutcome {
    pub valid: bool,
    pub score: f64,
    pub feedback: Vec<ValidationFeedback>,
    pub metrics: ValidationMetrics,
}

impl ValidateOutcome {
    /// Optimistic result used when the model output cannot be interpreted
    fn fallback() -> Self {
        let score = op_constants::FALLBACK_VALIDATION_SCORE;
        Self {
            valid: true,
            score,
            feedback: vec![ValidationFeedback {
                severity: FeedbackSeverity::Warning,
                message: "Model output could not be interpreted; default validation result applied"
                    .to_string(),
                suggestion: Some("Re-run validation or review the content manually".to_string()),
            }],
            metrics: ValidationMetrics::uniform(score),
        }
    }
}

fn unit(score: f64) -> f64 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

pub(crate) fn validation(parsed: &ParsedOutput) -> ValidateOutcome {
    match parsed {
        ParsedOutput::Structured(value) => structured_validation(value),
        ParsedOutput::Heuristic(sections) => heuristic_validation(sections),
    }
}

fn structured_validation(value: &Value) -> ValidateOutcome {
    let score = unit(json_f64(value, "score", op_constants::FALLBACK_VALIDATION_SCORE));
    let valid = json_bool(value, "valid", score >= op_constants::FALLBACK_VALIDATION_SCORE);

    let feedback = value
        .get("feedback")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_feedback).collect())
        .unwrap_or_default();

    let metrics = match value.get("metrics") {
        Some(m) => ValidationMetrics {
            accuracy: unit(json_f64(m, "accuracy", score)),
            completeness: unit(json_f64(m, "completeness", score)),
            clarity: unit(json_f64(m, "clarity", score)),
            consistency: unit(json_f64(m, "consistency", score)),
        },
        None => ValidationMetrics::uniform(score),
    };

    ValidateOutcome {
        valid,
        score,
        feedback,
        metrics,
    }
}

fn parse_feedback(item: &Value) -> Option<ValidationFeedback> {
    if let Ok(feedback) = serde_json::from_value::<ValidationFeedback>(item.clone()) {
        return Some(feedback);
    }
    item.as_str().map(|message| ValidationFeedback {
        severity: FeedbackSeverity::Info,
        message: message.to_string(),
        suggestion: None,
    })
}

fn heuristic_validation(sections: &Sections) -> ValidateOutcome {
    let score = sections.text(&["score"]).and_then(|s| parse_score(&s));
    let valid = sections.text(&["valid"]).and_then(|s| parse_yes_no(&s));

    let (Some(score), Some(valid)) = (score, valid) else {
        return ValidateOutcome::fallback();
    };

    let feedback = sections
        .items(&["feedback", "issues"])
        .into_iter()
        .map(|message| ValidationFeedback {
            severity: FeedbackSeverity::Info,
            message,
            suggestion: None,
        })
        .collect();

    ValidateOutcome {
        valid,
        score,
        feedback,
        metrics: ValidationMetrics::uniform(score),
    }
}

/// Accepts `0.85`, `85%`, `8.5/10` and `85/100`
fn parse_score(text: &str) -> Option<f64> {
    let token = text.split_whitespace().next()?.trim_end_matches(['.', ',']);
    let score = if let Some(pct) = token.strip_suffix('%') {
        pct.parse::<f64>().ok()? / 100.0
    } else if let Some((num, den)) = token.split_once('/') {
        let den = den.parse::<f64>().ok()?;
        if den <= 0.0 {
            return None;
        }
        num.parse::<f64>().ok()? / den
    } else {
        token.parse::<f64>().ok()?
    };
    score.is_finite().then(|| unit(score))
}

fn parse_yes_no(text: &str) -> Option<bool> {
    let word = text
        .split_whitespace()
        .next()?
        .trim_end_matches(['.', ','])
        .to_ascii_lowercase();
    match word.as_str() {
        "true" | "yes" | "valid" => Some(true),
        "false" | "no" | "invalid" => Some(false),
        _ => None,
    }
}
