//! LLM Provider Abstraction
//!
//! Defines the `AiProvider` trait: a capability-tagged completion/chat
//! interface implemented once per backend. The orchestrator is polymorphic
//! over `SharedProvider` and never sees concrete backend types.
//!
//! ## Modules
//!
//! - `openai`: OpenAI-compatible REST adapter
//! - `ollama`: local Ollama adapter
//! - `mock`: scripted test double
//! - `retry`: exponential backoff policy shared by adapters
//! - `usage`: per-provider usage accounting
//! - `pricing`: per-model token pricing table

mod mock;
mod ollama;
mod openai;
pub mod pricing;
pub mod retry;
pub mod usage;

pub use mock::{MockProvider, MockReply};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use pricing::ModelPricing;
pub use retry::RetryPolicy;
pub use usage::{UsageStats, UsageTracker};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{network as net_constants, retry as retry_constants};
use crate::types::{ApiDocError, Result};

// =============================================================================
// Capabilities
// =============================================================================

/// Named feature a provider declares support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    TextCompletion,
    ChatCompletion,
    CodeGeneration,
    Summarization,
    Translation,
    Analysis,
}

/// Capabilities of a general-purpose chat model
pub const GENERAL_CAPABILITIES: &[Capability] = &[
    Capability::TextCompletion,
    Capability::ChatCompletion,
    Capability::CodeGeneration,
    Capability::Summarization,
    Capability::Translation,
    Capability::Analysis,
];

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling options for a single completion.
///
/// `stream` is accepted for interface compatibility; adapters always return
/// the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    pub stream: bool,
    /// System prompt prepended by `complete`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl CompletionOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Messages for a single-prompt completion
    pub fn prompt_messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }
}

// =============================================================================
// Results
// =============================================================================

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" | "end_turn" | "eos" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Token counts and derived cost for one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Estimated cost in USD from the model pricing table
    pub estimated_cost: f64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated_cost: 0.0,
        }
    }

    /// Attach cost computed from `pricing`
    pub fn priced(mut self, pricing: &ModelPricing) -> Self {
        self.estimated_cost = pricing.cost(self.prompt_tokens, self.completion_tokens);
        self
    }

    /// Accumulate another usage into this one
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.estimated_cost += other.estimated_cost;
    }
}

/// Whole (non-streamed) completion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
    pub model: String,
    /// Backend response id
    pub response_id: String,
    pub created_at: DateTime<Utc>,
}

/// Shared provider type for concurrent access across operations.
pub type SharedProvider = Arc<dyn AiProvider>;

// =============================================================================
// Provider Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
    Mock,
}

/// Retry settings owned by each adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Jitter as a fraction of the computed delay (0 disables it)
    pub jitter: f64,
    /// Retry permanent (non-retryable) failures too
    pub retry_non_retryable: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: retry_constants::BASE_DELAY_MS,
            max_delay_ms: retry_constants::MAX_DELAY_MS,
            jitter: retry_constants::DEFAULT_JITTER,
            retry_non_retryable: false,
        }
    }
}

/// Configuration for one registered provider
///
/// Note: API keys are never serialized to output and are redacted in debug
/// output. Each adapter converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Registry name (unique per orchestrator)
    pub name: String,
    pub kind: ProviderKind,
    pub model: Option<String>,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub retry: RetryConfig,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            kind: ProviderKind::OpenAi,
            model: None,
            timeout_secs: net_constants::DEFAULT_TIMEOUT_SECS,
            temperature: net_constants::DEFAULT_TEMPERATURE,
            max_tokens: net_constants::DEFAULT_MAX_TOKENS,
            api_key: None,
            api_base: None,
            retry: RetryConfig::default(),
        }
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Pluggable completion/chat backend
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Declared capabilities
    fn capabilities(&self) -> &[Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Single-prompt completion
    async fn complete(&self, prompt: &str, options: &CompletionOptions)
    -> Result<CompletionResult>;

    /// Multi-message chat completion
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult>;

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool;

    /// Snapshot of this provider's cumulative usage
    fn usage_stats(&self) -> UsageStats;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        ProviderKind::Mock => Ok(Arc::new(MockProvider::new(config.name.clone()))),
    }
}

/// Reject configurations no adapter can run with
pub fn validate_provider_config(config: &ProviderConfig) -> Result<()> {
    if config.name.trim().is_empty() {
        return Err(ApiDocError::Config("Provider name must not be empty".to_string()));
    }
    if config.retry.max_attempts == 0 {
        return Err(ApiDocError::Config(format!(
            "Provider '{}': retry.max_attempts must be at least 1",
            config.name
        )));
    }
    if config.timeout_secs == 0 {
        return Err(ApiDocError::Config(format!(
            "Provider '{}': timeout_secs must be greater than 0",
            config.name
        )));
    }
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ApiDocError::Config(format!(
            "Provider '{}': temperature must be between 0.0 and 2.0, got {}",
            config.name, config.temperature
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_parse() {
        assert_eq!(FinishReason::parse("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::parse("length"), FinishReason::Length);
        assert!(FinishReason::parse("end_turn").is_stop());
        assert_eq!(
            FinishReason::parse("tool_calls"),
            FinishReason::Other("tool_calls".to_string())
        );
    }

    #[test]
    fn test_token_usage_add() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage::new(100, 50));
        total.add(&TokenUsage::new(10, 5));
        assert_eq!(total.prompt_tokens, 110);
        assert_eq!(total.completion_tokens, 55);
        assert_eq!(total.total_tokens, 165);
    }

    #[test]
    fn test_prompt_messages_with_system() {
        let options = CompletionOptions::default().system_prompt("be brief");
        let messages = options.prompt_messages("hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], ChatMessage::user("hello"));
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_validate_provider_config() {
        assert!(validate_provider_config(&ProviderConfig::default()).is_ok());
        let bad = ProviderConfig {
            retry: RetryConfig {
                max_attempts: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_provider_config(&bad).is_err());
    }

    #[test]
    fn test_create_mock_provider() {
        let config = ProviderConfig {
            name: "local-mock".to_string(),
            kind: ProviderKind::Mock,
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "local-mock");
        assert!(provider.supports(Capability::Summarization));
    }
}
