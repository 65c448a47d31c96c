//! Operation prompt templates.
//!
//! One template per operation. Each embeds the structured request fields as
//! labeled sections and ends with the JSON contract the response parsers
//! expect.

use super::{PromptBuilder, PromptConfig};
use crate::types::{
    EndpointData, EnhanceRequest, ProjectContext, SummarizeRequest, SummaryStyle,
    ValidateRequest, truncate_chars,
};

const SUMMARY_SCHEMA: &str = r#"{
  "summary": "one-sentence summary",
  "description": "detailed description",
  "keyPoints": ["string"],
  "useCases": ["string"],
  "example": "optional usage example"
}"#;

const ENHANCE_SCHEMA: &str = r#"{
  "enhancedContent": "the full improved content",
  "enhancements": [
    {
      "type": "addition | modification | removal | restructure",
      "section": "optional section name",
      "original": "optional original text",
      "suggested": "suggested text",
      "reason": "why this helps",
      "confidence": 0.0
    }
  ]
}"#;

const VALIDATE_SCHEMA: &str = r#"{
  "valid": true,
  "score": 0.0,
  "feedback": [
    {"severity": "info | warning | error", "message": "string", "suggestion": "optional"}
  ],
  "metrics": {"accuracy": 0.0, "completeness": 0.0, "clarity": 0.0, "consistency": 0.0}
}"#;

/// Renders the prompt for each operation
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    config: PromptConfig,
}

impl PromptLibrary {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    /// System prompt shared by all operations
    pub fn system_prompt(&self) -> String {
        format!(
            "You are an API documentation assistant. Write in a {} tone. \
             Only state facts supported by the provided endpoint data.",
            self.config.tone
        )
    }

    pub fn summarize(&self, request: &SummarizeRequest) -> String {
        let endpoint = &request.endpoint;
        let options = &request.options;

        let style = match options.style {
            SummaryStyle::Brief => "Keep the summary to one short sentence and the description brief",
            SummaryStyle::Detailed => "Give a complete description covering behavior and inputs",
            SummaryStyle::Technical => {
                "Use precise technical language and mention formats and status codes"
            }
        };

        let mut objectives = vec![
            "Summarize what the endpoint does in one sentence".to_string(),
            "Describe its behavior, inputs and outputs".to_string(),
            "List the key points a client developer must know".to_string(),
            "List typical use cases".to_string(),
            style.to_string(),
        ];
        if options.include_examples {
            objectives.push("Include a short usage example".to_string());
        }
        if let Some(max) = options.max_length {
            objectives.push(format!("Keep the description under {} characters", max));
        }

        let builder = PromptBuilder::new()
            .role("API technical writer", "REST endpoint documentation")
            .objectives(objectives)
            .context_opt("Audience", options.audience.as_deref());
        let builder = self.project(builder, request.context.as_ref());
        let builder = self.endpoint(builder, endpoint);

        self.finish(
            builder,
            SUMMARY_SCHEMA,
            &["Summary:", "Description:", "Key Points:", "Use Cases:", "Example:"],
        )
    }

    pub fn enhance(&self, request: &EnhanceRequest) -> String {
        let mut objectives = vec![format!(
            "Improve this {} for API documentation readers",
            request.content_type.as_str()
        )];
        if request.focus.is_empty() {
            objectives.push("Improve clarity and completeness".to_string());
        } else {
            let focus: Vec<&str> = request.focus.iter().map(|f| f.as_str()).collect();
            objectives.push(format!("Focus on: {}", focus.join(", ")));
        }
        objectives.push("Explain each change with a reason and a confidence in [0, 1]".to_string());
        objectives.push("Return the full enhanced content".to_string());

        let builder = PromptBuilder::new()
            .role("technical editor", "API documentation quality")
            .objectives(objectives)
            .context_item("Content Type", request.content_type.as_str());
        let builder = self.project(builder, request.context.as_ref());
        let builder = match &request.endpoint {
            Some(endpoint) => self.endpoint(builder, endpoint),
            None => builder,
        };
        let builder = builder.section("Content", self.content(&request.content));

        self.finish(
            builder,
            ENHANCE_SCHEMA,
            &["Enhanced Content:", "Suggestions:"],
        )
    }

    pub fn validate(&self, request: &ValidateRequest) -> String {
        let criteria: Vec<&str> = if request.criteria.is_empty() {
            vec!["accuracy", "completeness", "clarity", "consistency"]
        } else {
            request.criteria.iter().map(|c| c.as_str()).collect()
        };

        let builder = PromptBuilder::new()
            .role("API documentation reviewer", "documentation validation")
            .objectives([
                format!("Evaluate the content for: {}", criteria.join(", ")),
                "Score each metric and the overall content in [0, 1]".to_string(),
                "Report concrete problems as feedback with a severity".to_string(),
                "Mark the content invalid if it contains errors a reader would act on".to_string(),
            ])
            .context_item("Content Type", request.content_type.as_str());
        let builder = self.project(builder, request.context.as_ref());
        let builder = match &request.endpoint {
            Some(endpoint) => self.endpoint(builder, endpoint),
            None => builder,
        };
        let builder = builder.section("Content", self.content(&request.content));

        self.finish(
            builder,
            VALIDATE_SCHEMA,
            &["Valid:", "Score:", "Feedback:"],
        )
    }

    fn finish(&self, builder: PromptBuilder, schema: &str, labels: &[&str]) -> String {
        if self.config.include_schema {
            builder.output(schema, labels).build()
        } else {
            builder.build()
        }
    }

    fn content(&self, content: &str) -> String {
        truncate_chars(content, self.config.max_content_chars)
    }

    fn project(&self, builder: PromptBuilder, context: Option<&ProjectContext>) -> PromptBuilder {
        let Some(context) = context else {
            return builder;
        };
        builder
            .context_opt("Project", context.name.as_deref())
            .context_opt("Project Description", context.description.as_deref())
            .context_opt("API Version", context.version.as_deref())
            .context_opt("Base URL", context.base_url.as_deref())
            .context_opt("Target Audience", context.audience.as_deref())
    }

    fn endpoint(&self, builder: PromptBuilder, endpoint: &EndpointData) -> PromptBuilder {
        let mut builder = builder
            .context_item("Method", endpoint.method.to_uppercase())
            .context_item("Path", endpoint.path.clone())
            .context_opt("Existing Summary", endpoint.summary.as_deref())
            .context_opt("Existing Description", endpoint.description.as_deref());

        if !endpoint.tags.is_empty() {
            builder = builder.context_item("Tags", endpoint.tags.join(", "));
        }
        if endpoint.deprecated {
            builder = builder.context_item("Deprecated", "yes");
        }

        if !endpoint.parameters.is_empty() {
            let lines: Vec<String> = endpoint
                .parameters
                .iter()
                .map(|p| {
                    let mut line = format!(
                        "- {} (in: {}, {})",
                        p.name,
                        p.location,
                        if p.required { "required" } else { "optional" }
                    );
                    if let Some(desc) = &p.description {
                        line.push_str(": ");
                        line.push_str(desc);
                    }
                    line
                })
                .collect();
            builder = builder.section("Parameters", lines.join("\n"));
        }

        if let Some(body) = &endpoint.request_body
            && self.config.include_schema
        {
            let rendered = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
            builder = builder.section(
                "Request Body",
                format!("```json\n{}\n```", self.content(&rendered)),
            );
        }

        if !endpoint.responses.is_empty() {
            let lines: Vec<String> = endpoint
                .responses
                .iter()
                .map(|r| match &r.description {
                    Some(desc) => format!("- {}: {}", r.status_code, desc),
                    None => format!("- {}", r.status_code),
                })
                .collect();
            builder = builder.section("Responses", lines.join("\n"));
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnhancementFocus, Parameter, ResponseSpec, ValidationCriterion};

    fn users_endpoint() -> EndpointData {
        let mut endpoint = EndpointData::new("get", "/users");
        endpoint.parameters.push(Parameter {
            name: "limit".to_string(),
            location: "query".to_string(),
            required: false,
            description: Some("Page size".to_string()),
            schema: None,
        });
        endpoint.responses.push(ResponseSpec {
            status_code: "200".to_string(),
            description: Some("A page of users".to_string()),
            schema: None,
        });
        endpoint
    }

    #[test]
    fn test_summarize_prompt_embeds_endpoint() {
        let library = PromptLibrary::default();
        let prompt = library.summarize(&SummarizeRequest::new(users_endpoint()));

        assert!(prompt.contains("**Method**: GET"));
        assert!(prompt.contains("**Path**: /users"));
        assert!(prompt.contains("- limit (in: query, optional): Page size"));
        assert!(prompt.contains("- 200: A page of users"));
        assert!(prompt.contains("\"keyPoints\""));
        assert!(prompt.contains("Key Points:"));
    }

    #[test]
    fn test_summarize_prompt_is_deterministic() {
        let library = PromptLibrary::default();
        let request = SummarizeRequest::new(users_endpoint());
        assert_eq!(library.summarize(&request), library.summarize(&request));
    }

    #[test]
    fn test_enhance_prompt_lists_focus() {
        let library = PromptLibrary::default();
        let mut request = EnhanceRequest::new("Gets users.");
        request.focus = vec![EnhancementFocus::Clarity, EnhancementFocus::Examples];

        let prompt = library.enhance(&request);
        assert!(prompt.contains("Focus on: clarity, examples"));
        assert!(prompt.contains("# Content\n\nGets users."));
        assert!(prompt.contains("\"enhancements\""));
    }

    #[test]
    fn test_validate_prompt_criteria() {
        let library = PromptLibrary::default();
        let mut request = ValidateRequest::new("Deletes a user.");
        request.criteria = vec![ValidationCriterion::Accuracy];
        let prompt = library.validate(&request);
        assert!(prompt.contains("Evaluate the content for: accuracy"));

        let prompt = library.validate(&ValidateRequest::new("Deletes a user."));
        assert!(prompt.contains("accuracy, completeness, clarity, consistency"));
    }

    #[test]
    fn test_long_content_truncated() {
        let library = PromptLibrary::new(PromptConfig {
            max_content_chars: 10,
            ..Default::default()
        });
        let prompt = library.enhance(&EnhanceRequest::new("x".repeat(100)));
        assert!(prompt.contains("...[truncated]"));
        assert!(!prompt.contains(&"x".repeat(11)));
    }

    #[test]
    fn test_schema_can_be_omitted() {
        let library = PromptLibrary::new(PromptConfig {
            include_schema: false,
            ..Default::default()
        });
        let prompt = library.validate(&ValidateRequest::new("text"));
        assert!(!prompt.contains("<OUTPUT>"));
    }
}
