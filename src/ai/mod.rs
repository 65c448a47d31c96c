//! AI Integration Layer
//!
//! Provider abstraction plus the shared machinery the orchestrator composes:
//! rate limiting, response caching, prompt rendering, output parsing and
//! confidence scoring.

pub mod cache;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod rate_limiter;
pub mod scoring;
pub mod timeout;

pub use cache::{CacheConfig, CacheStats, CacheTtls, ResponseCache, cache_key, canonical_json};
pub use parse::{ParsedOutput, Sections};
pub use prompt::{PromptBuilder, PromptConfig, PromptLibrary};
pub use provider::{
    AiProvider, Capability, ChatMessage, CompletionOptions, CompletionResult, FinishReason,
    MockProvider, MockReply, OllamaProvider, OpenAiProvider, ProviderConfig, ProviderKind,
    RetryConfig, SharedProvider, TokenUsage, UsageStats, create_provider,
};
pub use rate_limiter::{RateLimitConfig, RateLimitSnapshot, RateLimiter};
pub use scoring::{ConfidenceScore, ConfidenceScorer};
pub use timeout::{with_cancel, with_timeout};
