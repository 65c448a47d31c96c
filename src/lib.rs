//! apidoc-ai - AI Enhancement Orchestrator for API Documentation
//!
//! Turns endpoint data and documentation text into AI-written summaries,
//! enhancements and validations through pluggable model providers, while
//! enforcing request-rate limits, caching idempotent results and running bulk
//! work under bounded concurrency.
//!
//! ## Quick Start
//!
//! ```ignore
//! use apidoc_ai::{AiServiceOptions, EndpointData, Orchestrator, SummarizeRequest};
//! use apidoc_ai::ai::{OpenAiProvider, ProviderConfig};
//!
//! let orchestrator = Orchestrator::new(AiServiceOptions::default())?;
//! orchestrator.register_provider(
//!     "openai",
//!     Arc::new(OpenAiProvider::new(ProviderConfig::default())?),
//! )?;
//!
//! let response = orchestrator
//!     .summarize(SummarizeRequest::new(EndpointData::new("GET", "/users")))
//!     .await?;
//! println!("{} ({:.2})", response.summary.summary, response.confidence);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: provider abstraction and adapters, rate limiter, response cache,
//!   prompt library, output parsing, confidence scoring
//! - [`orchestrator`]: operation coordination, provider registry, batch engine
//! - [`config`]: typed configuration and the figment-based loader
//! - [`types`]: endpoint data, request/response types, errors

pub mod ai;
pub mod config;
pub mod constants;
pub mod orchestrator;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{AiServiceOptions, Config, ConfigLoader};

// Error Types
pub use types::error::{
    ApiDocError, ErrorCategory, ErrorCode, OperationError, ProviderError, Result,
};

// Orchestration
pub use orchestrator::{BatchEngine, OperationResult, Orchestrator, ProviderRegistry};

// Domain Types
pub use types::{
    BatchItem, BatchOptions, BatchRequest, BatchResponse, EndpointData, EnhanceRequest,
    EnhanceResponse, FailureStrategy, OperationRequest, OperationResponse, ProjectContext,
    SummarizeRequest, SummarizeResponse, ValidateRequest, ValidateResponse,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    AiProvider, Capability, CompletionOptions, CompletionResult, MockProvider, MockReply,
    SharedProvider, TokenUsage, UsageStats, create_provider,
};
