//! Prompt Builder System
//!
//! Standardized prompt construction for the orchestrator's operations.
//! Builders are pure: the same sections in the same order always render the
//! same text, which keeps cache keys and tests reproducible.
//!
//! ## Layout
//!
//! 1. **Role**: who the model is and what it is doing
//! 2. **Objectives**: numbered goals
//! 3. **Context**: ordered `**Label**: value` pairs
//! 4. **Sections**: the material to work on
//! 5. **Output schema**: the JSON shape to answer with, plus the labeled
//!    plain-text fallback the heuristic parser understands

mod templates;

pub use templates::PromptLibrary;

use serde::{Deserialize, Serialize};

/// Prompt rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Content longer than this is truncated before embedding
    pub max_content_chars: usize,
    /// Append the JSON output schema to every prompt
    pub include_schema: bool,
    /// Writing tone requested from the model
    pub tone: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_content_chars: 8000,
            include_schema: true,
            tone: "professional".to_string(),
        }
    }
}

/// Prompt section types
#[derive(Debug, Clone, PartialEq)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Labeled values, rendered in insertion order
    Context(Vec<(String, String)>),
    /// Headed block of free text
    Text { header: String, content: String },
    /// Output contract: JSON schema and plain-text fallback labels
    Output {
        schema: String,
        fallback_labels: Vec<String>,
    },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives<I, S>(mut self, objectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Add a labeled value to the first context section, creating it if needed
    pub fn context_item(mut self, key: &str, value: impl Into<String>) -> Self {
        let entry = (key.to_string(), value.into());
        let existing = self.sections.iter_mut().find_map(|section| match section {
            PromptSection::Context(items) => Some(items),
            _ => None,
        });
        match existing {
            Some(items) => items.push(entry),
            None => self.sections.push(PromptSection::Context(vec![entry])),
        }
        self
    }

    /// Add a labeled value only when present
    pub fn context_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.trim().is_empty() => self.context_item(key, value),
            _ => self,
        }
    }

    pub fn section(mut self, header: &str, content: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Text {
            header: header.to_string(),
            content: content.into(),
        });
        self
    }

    pub fn output(mut self, schema: &str, fallback_labels: &[&str]) -> Self {
        self.sections.push(PromptSection::Output {
            schema: schema.to_string(),
            fallback_labels: fallback_labels.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    prompt.push_str(&format!("# {}\n\n", header));
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Output {
                    schema,
                    fallback_labels,
                } => {
                    prompt.push_str("<OUTPUT>\n");
                    prompt.push_str("Respond with a single JSON object matching this shape:\n");
                    prompt.push_str("```json\n");
                    prompt.push_str(&schema);
                    prompt.push_str("\n```\n");
                    if !fallback_labels.is_empty() {
                        prompt.push_str(
                            "If you cannot produce JSON, answer with these labeled sections, \
                             one per line, using '-' bullets for lists: ",
                        );
                        prompt.push_str(&fallback_labels.join(", "));
                        prompt.push('\n');
                    }
                    prompt.push_str("</OUTPUT>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}
