//! Model output parsing.
//!
//! Every completion is parsed into a [`ParsedOutput`]: structured JSON when
//! the text contains a (possibly repaired) JSON object, heuristic sections
//! otherwise. Operation interpreters handle both arms separately, and the
//! chosen arm is reported to callers as [`ParseMode`].

mod json_repair;
mod sections;

pub use json_repair::{Extracted, extract_json};
pub use sections::{Section, Sections};

use serde_json::Value;
use tracing::warn;

use crate::types::ParseMode;

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    Structured(Value),
    Heuristic(Sections),
}

impl ParsedOutput {
    /// Parse raw model text. Only JSON objects count as structured output.
    pub fn parse(text: &str) -> Self {
        match extract_json(text) {
            Some(Extracted {
                value: value @ Value::Object(_),
                ..
            }) => Self::Structured(value),
            _ => Self::Heuristic(Sections::extract(text)),
        }
    }

    /// Parse and log when the heuristic arm was taken
    pub fn parse_logged(text: &str, operation: &str) -> Self {
        let parsed = Self::parse(text);
        if let Self::Heuristic(sections) = &parsed {
            warn!(
                operation,
                parse_mode = %ParseMode::Heuristic,
                labels = sections.labels().count(),
                bullets = sections.bullets().len(),
                "Model output was not structured JSON, using heuristic extraction"
            );
        }
        parsed
    }

    pub fn mode(&self) -> ParseMode {
        match self {
            Self::Structured(_) => ParseMode::Structured,
            Self::Heuristic(_) => ParseMode::Heuristic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object_is_structured() {
        let parsed = ParsedOutput::parse(r#"{"summary": "Lists users"}"#);
        assert_eq!(parsed.mode(), ParseMode::Structured);
    }

    #[test]
    fn test_scalar_json_is_heuristic() {
        let parsed = ParsedOutput::parse("42");
        assert_eq!(parsed.mode(), ParseMode::Heuristic);

        let parsed = ParsedOutput::parse(r#"["a", "b"]"#);
        assert_eq!(parsed.mode(), ParseMode::Heuristic);
    }

    #[test]
    fn test_prose_is_heuristic() {
        match ParsedOutput::parse("Summary: Deletes a user.\n- irreversible") {
            ParsedOutput::Heuristic(sections) => {
                assert_eq!(
                    sections.text(&["summary"]).as_deref(),
                    Some("Deletes a user.")
                );
                assert_eq!(sections.items(&["summary"]), vec!["irreversible"]);
            }
            other => panic!("expected heuristic output, got {:?}", other),
        }
    }
}
