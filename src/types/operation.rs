//! Request and response types for orchestrator operations.
//!
//! Responses carry a shared [`ResponseMeta`] block (result id, provider,
//! usage, timing, cache flag and parse mode) flattened into their JSON form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::endpoint::{EndpointData, ProjectContext};
use super::error::OperationError;
use crate::ai::provider::TokenUsage;
use crate::constants::batch as batch_constants;

// =============================================================================
// Operation Kinds
// =============================================================================

/// The three AI operations the orchestrator performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Summarize,
    Enhance,
    Validate,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Enhance => "enhance",
            Self::Validate => "validate",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the model output was turned into structured data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Model returned parseable JSON
    #[default]
    Structured,
    /// JSON parsing failed; fields were extracted from labeled sections
    Heuristic,
}

impl std::fmt::Display for ParseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => f.write_str("structured"),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// Metadata shared by every operation response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Tracing id (timestamp + random suffix); not a primary key
    pub id: String,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub processing_time_ms: u64,
    pub cached: bool,
    pub parse_mode: ParseMode,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Summarize
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    Brief,
    #[default]
    Detailed,
    Technical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarizeOptions {
    pub style: SummaryStyle,
    pub include_examples: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub endpoint: EndpointData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ProjectContext>,
    #[serde(default)]
    pub options: SummarizeOptions,
    /// Provider override; the registry default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl SummarizeRequest {
    pub fn new(endpoint: EndpointData) -> Self {
        Self {
            endpoint,
            context: None,
            options: SummarizeOptions::default(),
            provider: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub summary: EndpointSummary,
    /// Heuristic confidence in [0, 1]
    pub confidence: f64,
}

// =============================================================================
// Enhance
// =============================================================================

/// Kind of documentation content being enhanced or validated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Description,
    Summary,
    Example,
    Guide,
    Reference,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Summary => "summary",
            Self::Example => "example",
            Self::Guide => "guide",
            Self::Reference => "reference",
        }
    }
}

/// Aspect the caller wants improved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementFocus {
    Clarity,
    Completeness,
    Examples,
    Formatting,
    Grammar,
    Consistency,
}

impl EnhancementFocus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clarity => "clarity",
            Self::Completeness => "completeness",
            Self::Examples => "examples",
            Self::Formatting => "formatting",
            Self::Grammar => "grammar",
            Self::Consistency => "consistency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub focus: Vec<EnhancementFocus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ProjectContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl EnhanceRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: ContentType::default(),
            focus: Vec::new(),
            endpoint: None,
            context: None,
            provider: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementType {
    Addition,
    Modification,
    Removal,
    Restructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enhancement {
    #[serde(rename = "type")]
    pub kind: EnhancementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    pub suggested: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub original_content: String,
    pub enhanced_content: String,
    pub enhancements: Vec<Enhancement>,
}

// =============================================================================
// Validate
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationCriterion {
    Accuracy,
    Completeness,
    Clarity,
    Consistency,
}

impl ValidationCriterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Completeness => "completeness",
            Self::Clarity => "clarity",
            Self::Consistency => "consistency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub criteria: Vec<ValidationCriterion>,
    /// Endpoint the content claims to document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ProjectContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl ValidateRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: ContentType::default(),
            criteria: Vec::new(),
            endpoint: None,
            context: None,
            provider: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSeverity {
    #[default]
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFeedback {
    #[serde(default)]
    pub severity: FeedbackSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    pub accuracy: f64,
    pub completeness: f64,
    pub clarity: f64,
    pub consistency: f64,
}

impl ValidationMetrics {
    pub fn uniform(value: f64) -> Self {
        Self {
            accuracy: value,
            completeness: value,
            clarity: value,
            consistency: value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub valid: bool,
    pub score: f64,
    pub feedback: Vec<ValidationFeedback>,
    pub metrics: ValidationMetrics,
}

// =============================================================================
// Generic Operation Envelope
// =============================================================================

/// Any single operation request, tagged by operation type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "opType", content = "request", rename_all = "lowercase")]
pub enum OperationRequest {
    Summarize(SummarizeRequest),
    Enhance(EnhanceRequest),
    Validate(ValidateRequest),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Summarize(_) => OperationKind::Summarize,
            Self::Enhance(_) => OperationKind::Enhance,
            Self::Validate(_) => OperationKind::Validate,
        }
    }

    /// Provider override named in the request
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Summarize(r) => r.provider.as_deref(),
            Self::Enhance(r) => r.provider.as_deref(),
            Self::Validate(r) => r.provider.as_deref(),
        }
    }
}

/// Any single operation response, tagged by operation type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "opType", content = "response", rename_all = "lowercase")]
pub enum OperationResponse {
    Summarize(SummarizeResponse),
    Enhance(EnhanceResponse),
    Validate(ValidateResponse),
}

impl OperationResponse {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Summarize(_) => OperationKind::Summarize,
            Self::Enhance(_) => OperationKind::Enhance,
            Self::Validate(_) => OperationKind::Validate,
        }
    }

    pub fn meta(&self) -> &ResponseMeta {
        match self {
            Self::Summarize(r) => &r.meta,
            Self::Enhance(r) => &r.meta,
            Self::Validate(r) => &r.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ResponseMeta {
        match self {
            Self::Summarize(r) => &mut r.meta,
            Self::Enhance(r) => &mut r.meta,
            Self::Validate(r) => &mut r.meta,
        }
    }
}

// =============================================================================
// Batch
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStrategy {
    /// Record every item's outcome and keep going
    #[default]
    Continue,
    /// Abort remaining chunks at the first failure
    StopOnError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    pub max_concurrency: usize,
    pub failure_strategy: FailureStrategy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: batch_constants::DEFAULT_MAX_CONCURRENCY,
            failure_strategy: FailureStrategy::Continue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    #[serde(flatten)]
    pub operation: OperationRequest,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, operation: OperationRequest) -> Self {
        Self {
            id: id.into(),
            operation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    /// Falls back to the configured batch options when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BatchOptions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub id: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl BatchResult {
    pub fn success(id: impl Into<String>, response: OperationResponse) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Success,
            result: Some(response),
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: OperationError) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Error,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// No failures
    Completed,
    /// At least one success and one failure
    Partial,
    /// No successes
    Failed,
}

impl BatchStatus {
    pub fn from_counts(success_count: usize, failure_count: usize) -> Self {
        match (success_count, failure_count) {
            (_, 0) => Self::Completed,
            (0, _) => Self::Failed,
            _ => Self::Partial,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub id: String,
    pub status: BatchStatus,
    pub results: Vec<BatchResult>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_token_usage: TokenUsage,
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_from_counts() {
        assert_eq!(BatchStatus::from_counts(5, 0), BatchStatus::Completed);
        assert_eq!(BatchStatus::from_counts(4, 1), BatchStatus::Partial);
        assert_eq!(BatchStatus::from_counts(0, 3), BatchStatus::Failed);
        // An empty batch has nothing failed
        assert_eq!(BatchStatus::from_counts(0, 0), BatchStatus::Completed);
    }

    #[test]
    fn test_batch_item_from_json() {
        let item: BatchItem = serde_json::from_str(
            r#"{
                "id": "item-1",
                "opType": "enhance",
                "request": {"content": "Returns users", "focus": ["clarity"]}
            }"#,
        )
        .unwrap();
        assert_eq!(item.id, "item-1");
        assert_eq!(item.operation.kind(), OperationKind::Enhance);
        match item.operation {
            OperationRequest::Enhance(req) => {
                assert_eq!(req.content, "Returns users");
                assert_eq!(req.focus, vec![EnhancementFocus::Clarity]);
                assert_eq!(req.content_type, ContentType::Description);
            }
            other => panic!("unexpected operation: {:?}", other),
        }
    }

    #[test]
    fn test_failure_strategy_names() {
        let strategy: FailureStrategy = serde_json::from_str("\"stop-on-error\"").unwrap();
        assert_eq!(strategy, FailureStrategy::StopOnError);
        assert_eq!(
            serde_json::to_string(&FailureStrategy::Continue).unwrap(),
            "\"continue\""
        );
    }

    #[test]
    fn test_batch_options_defaults() {
        let options: BatchOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.max_concurrency, 3);
        assert_eq!(options.failure_strategy, FailureStrategy::Continue);
    }
}
