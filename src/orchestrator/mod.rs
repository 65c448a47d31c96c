//! AI Documentation Orchestrator
//!
//! Coordinates the response cache, rate limiter, prompt library and the
//! registered providers for one logical operation at a time.
//!
//! ## Per-call Flow
//!
//! ```text
//! cache lookup ─ hit ──► cached response (new id, processing time 0)
//!      │
//!     miss ─► rate-limit wait ─► prompt ─► provider call ─► parse ─► cache store
//! ```
//!
//! Retries belong to the provider adapters. The orchestrator never retries;
//! it wraps failures into an [`OperationError`] under the operation's code.
//!
//! ## Cancellation
//!
//! [`Orchestrator::execute`] observes a caller token at the rate-limit wait
//! and the provider call (including adapter backoff sleeps). The convenience
//! operations use the orchestrator-wide token cancelled by
//! [`Orchestrator::shutdown`].

mod batch;
mod interpret;
mod registry;

pub use batch::{BatchEngine, OperationResult};
pub use registry::ProviderRegistry;

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::ai::{
    CacheStats, CompletionOptions, CompletionResult, ConfidenceScorer, ParsedOutput,
    PromptLibrary, RateLimitSnapshot, RateLimiter, ResponseCache, SharedProvider, UsageStats,
    cache_key, create_provider, with_cancel,
};
use crate::config::{AiServiceOptions, Config};
use crate::constants::operation as op_constants;
use crate::types::{
    BatchRequest, BatchResponse, EnhanceRequest, EnhanceResponse, ErrorCode,
    OperationError, OperationKind, OperationRequest, OperationResponse, ResponseMeta, Result,
    SummarizeRequest, SummarizeResponse, ValidateRequest, ValidateResponse, generate_result_id,
};

/// Error code reported when an operation of `kind` fails
fn failure_code(kind: OperationKind) -> ErrorCode {
    match kind {
        OperationKind::Summarize => ErrorCode::SummarizationFailed,
        OperationKind::Enhance => ErrorCode::EnhancementFailed,
        OperationKind::Validate => ErrorCode::ValidationFailed,
    }
}

fn unexpected_response(expected: OperationKind, got: &OperationResponse) -> OperationError {
    OperationError::new(
        failure_code(expected),
        format!("expected a {} response, got {}", expected, got.kind()),
    )
}

pub struct Orchestrator {
    options: AiServiceOptions,
    registry: ProviderRegistry,
    limiter: RateLimiter,
    cache: ResponseCache<OperationResponse>,
    prompts: PromptLibrary,
    scorer: ConfidenceScorer,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("cache_size", &self.cache.len())
            .field("rate_limit", self.limiter.config())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(options: AiServiceOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            registry: ProviderRegistry::new(),
            limiter: RateLimiter::new(options.rate_limit.clone()),
            cache: ResponseCache::new(options.cache.max_size),
            prompts: PromptLibrary::new(options.prompt.clone()),
            scorer: ConfidenceScorer::new(),
            shutdown: CancellationToken::new(),
            options,
        })
    }

    /// Build an orchestrator and register every configured provider
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let orchestrator = Self::new(config.service.clone())?;
        for provider_config in &config.providers {
            let provider = create_provider(provider_config)?;
            orchestrator.register_provider(provider_config.name.clone(), provider)?;
        }
        if let Some(default) = &config.default_provider {
            orchestrator.set_default_provider(default)?;
        }
        Ok(orchestrator)
    }

    // =========================================================================
    // Providers
    // =========================================================================

    pub fn register_provider(
        &self,
        name: impl Into<String>,
        provider: SharedProvider,
    ) -> Result<()> {
        self.registry.register(name, provider)
    }

    pub fn set_default_provider(&self, name: &str) -> Result<()> {
        self.registry.set_default(name)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn usage_report(&self) -> BTreeMap<String, UsageStats> {
        self.registry.usage_report()
    }

    // =========================================================================
    // Shared State
    // =========================================================================

    pub fn options(&self) -> &AiServiceOptions {
        &self.options
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        self.limiter.snapshot()
    }

    /// Cancel every in-flight and future call made through the convenience
    /// operations
    pub fn shutdown(&self) {
        info!("Orchestrator shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn summarize(
        &self,
        request: SummarizeRequest,
    ) -> OperationResult<SummarizeResponse> {
        match self
            .execute(OperationRequest::Summarize(request), &self.shutdown)
            .await?
        {
            OperationResponse::Summarize(response) => Ok(response),
            other => Err(unexpected_response(OperationKind::Summarize, &other)),
        }
    }

    pub async fn enhance(&self, request: EnhanceRequest) -> OperationResult<EnhanceResponse> {
        match self
            .execute(OperationRequest::Enhance(request), &self.shutdown)
            .await?
        {
            OperationResponse::Enhance(response) => Ok(response),
            other => Err(unexpected_response(OperationKind::Enhance, &other)),
        }
    }

    pub async fn validate(&self, request: ValidateRequest) -> OperationResult<ValidateResponse> {
        match self
            .execute(OperationRequest::Validate(request), &self.shutdown)
            .await?
        {
            OperationResponse::Validate(response) => Ok(response),
            other => Err(unexpected_response(OperationKind::Validate, &other)),
        }
    }

    /// Run a batch; per-request options override the configured ones
    pub async fn batch_process(&self, request: BatchRequest) -> OperationResult<BatchResponse> {
        let options = request
            .options
            .unwrap_or_else(|| self.options.batch.clone());
        BatchEngine::new(options)
            .run(request.items, |operation| {
                self.execute(operation, &self.shutdown)
            })
            .await
    }

    /// Run one operation, aborting promptly if `token` (or the orchestrator
    /// shutdown token) is cancelled.
    #[instrument(
        skip(self, request, token),
        fields(op = %request.kind(), provider = request.provider().unwrap_or("default"))
    )]
    pub async fn execute(
        &self,
        request: OperationRequest,
        token: &CancellationToken,
    ) -> OperationResult<OperationResponse> {
        let kind = request.kind();
        let result = with_cancel(&self.shutdown, self.run(&request, token)).await;

        match result {
            Ok(response) => Ok(response),
            Err(err) => {
                let error = OperationError::wrap(failure_code(kind), &err);
                warn!(code = %error.code, retryable = error.retryable, "Operation failed: {}", err);
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        request: &OperationRequest,
        token: &CancellationToken,
    ) -> Result<OperationResponse> {
        let kind = request.kind();
        let start = Instant::now();

        let key = if self.options.cache.enabled {
            Some(cache_key(kind.as_str(), request)?)
        } else {
            None
        };

        if let Some(key) = &key
            && let Some(mut hit) = self.cache.get(key)
        {
            debug!(op = %kind, "Cache hit");
            let meta = hit.meta_mut();
            meta.id = generate_result_id();
            meta.processing_time_ms = 0;
            meta.cached = true;
            return Ok(hit);
        }
        debug!(op = %kind, cache_enabled = key.is_some(), "Cache miss");

        let provider = self.registry.resolve(request.provider())?;

        let waited =
            with_cancel(token, async { Ok(self.limiter.wait_for_capacity().await) }).await?;
        if !waited.is_zero() {
            debug!(wait_ms = waited.as_millis() as u64, "Waited for rate limit capacity");
        }

        let (prompt, options) = self.render(request);
        debug!(
            provider = provider.name(),
            prompt_chars = prompt.len(),
            "Calling provider"
        );

        let completion = with_cancel(token, provider.complete(&prompt, &options)).await?;
        self.limiter
            .record_tokens(u64::from(completion.usage.total_tokens));

        let parsed = ParsedOutput::parse_logged(&completion.text, kind.as_str());
        let meta = ResponseMeta {
            id: generate_result_id(),
            provider: provider.name().to_string(),
            model: completion.model.clone(),
            usage: completion.usage,
            processing_time_ms: start.elapsed().as_millis() as u64,
            cached: false,
            parse_mode: parsed.mode(),
            created_at: Utc::now(),
        };

        let response = self.interpret(request, &completion, &parsed, meta);

        if let Some(key) = key {
            self.cache
                .set(key, response.clone(), self.options.cache.ttl.for_operation(kind));
        }

        info!(
            op = %kind,
            provider = %response.meta().provider,
            parse_mode = %response.meta().parse_mode,
            tokens = response.meta().usage.total_tokens,
            processing_time_ms = response.meta().processing_time_ms,
            "Operation completed"
        );
        Ok(response)
    }

    fn render(&self, request: &OperationRequest) -> (String, CompletionOptions) {
        let options = CompletionOptions::default().system_prompt(self.prompts.system_prompt());
        match request {
            OperationRequest::Summarize(r) => (self.prompts.summarize(r), options),
            OperationRequest::Enhance(r) => (self.prompts.enhance(r), options),
            OperationRequest::Validate(r) => (
                self.prompts.validate(r),
                CompletionOptions {
                    temperature: Some(op_constants::VALIDATE_TEMPERATURE),
                    ..options
                },
            ),
        }
    }

    fn interpret(
        &self,
        request: &OperationRequest,
        completion: &CompletionResult,
        parsed: &ParsedOutput,
        meta: ResponseMeta,
    ) -> OperationResponse {
        match request {
            OperationRequest::Summarize(r) => {
                let score = self.scorer.score(completion, &r.endpoint);
                debug!(
                    endpoint = %r.endpoint.label(),
                    confidence = score.confidence,
                    bonuses = ?score.bonuses,
                    "Scored summary"
                );
                OperationResponse::Summarize(SummarizeResponse {
                    meta,
                    summary: interpret::summary(parsed, &completion.text),
                    confidence: score.confidence,
                })
            }
            OperationRequest::Enhance(r) => {
                let outcome = interpret::enhancement(parsed, &completion.text, &r.content);
                OperationResponse::Enhance(EnhanceResponse {
                    meta,
                    original_content: r.content.clone(),
                    enhanced_content: outcome.enhanced_content,
                    enhancements: outcome.enhancements,
                })
            }
            OperationRequest::Validate(_) => {
                let outcome = interpret::validation(parsed);
                OperationResponse::Validate(ValidateResponse {
                    meta,
                    valid: outcome.valid,
                    score: outcome.score,
                    feedback: outcome.feedback,
                    metrics: outcome.metrics,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{FinishReason, MockProvider, MockReply};
    use crate::ai::{CacheConfig, RateLimitConfig};
    use crate::types::{
        BatchItem, BatchOptions, BatchStatus, EndpointData, EnhancementType, FailureStrategy,
        Parameter, ParseMode,
    };
    use std::sync::Arc;
    use std::time::Duration;

    const SUMMARY_JSON: &str = r#"{"summary": "Lists users", "description": "Returns all users",
        "keyPoints": ["paginated"], "useCases": ["admin screens"]}"#;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(AiServiceOptions::default()).unwrap()
    }

    fn with_mock(mock: MockProvider) -> (Orchestrator, Arc<MockProvider>) {
        let orchestrator = orchestrator();
        let mock = Arc::new(mock);
        orchestrator.register_provider("mock", mock.clone()).unwrap();
        (orchestrator, mock)
    }

    fn users_request() -> SummarizeRequest {
        SummarizeRequest::new(EndpointData::new("GET", "/users"))
    }

    #[tokio::test]
    async fn test_summarize_confidence_scenario() {
        let (orchestrator, _) = with_mock(
            MockProvider::new("mock")
                .with_reply(MockReply::completion(SUMMARY_JSON, FinishReason::Stop, 80)),
        );

        let response = orchestrator.summarize(users_request()).await.unwrap();
        assert!((response.confidence - 0.8).abs() < 1e-9);
        assert_eq!(response.summary.summary, "Lists users");
        assert_eq!(response.meta.parse_mode, ParseMode::Structured);
        assert_eq!(response.meta.provider, "mock");
        assert!(!response.meta.cached);
    }

    #[tokio::test]
    async fn test_complex_endpoint_scores_higher() {
        let (orchestrator, _) = with_mock(
            MockProvider::new("mock")
                .with_reply(MockReply::completion(SUMMARY_JSON, FinishReason::Length, 20)),
        );
        let mut endpoint = EndpointData::new("GET", "/users/{id}");
        endpoint.parameters.push(Parameter {
            name: "id".to_string(),
            location: "path".to_string(),
            required: true,
            ..Default::default()
        });

        let response = orchestrator
            .summarize(SummarizeRequest::new(endpoint))
            .await
            .unwrap();
        assert!((response.confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider_and_limiter() {
        let (orchestrator, mock) =
            with_mock(MockProvider::new("mock").with_default_reply(MockReply::text(SUMMARY_JSON)));

        let first = orchestrator.summarize(users_request()).await.unwrap();
        let second = orchestrator.summarize(users_request()).await.unwrap();

        assert_eq!(mock.call_count(), 1);
        assert_eq!(orchestrator.rate_limit_snapshot().count, 1);
        assert!(second.meta.cached);
        assert_eq!(second.meta.processing_time_ms, 0);
        assert_ne!(first.meta.id, second.meta.id);
        assert_eq!(first.summary, second.summary);

        let stats = orchestrator.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_calls_provider() {
        let options = AiServiceOptions {
            cache: CacheConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(options).unwrap();
        let mock = Arc::new(MockProvider::new("mock"));
        orchestrator.register_provider("mock", mock.clone()).unwrap();

        orchestrator.summarize(users_request()).await.unwrap();
        orchestrator.summarize(users_request()).await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_enhance_fallback() {
        let (orchestrator, _) = with_mock(
            MockProvider::new("mock")
                .with_reply(MockReply::text("Mention the pagination limit of 100 users.")),
        );

        let response = orchestrator
            .enhance(EnhanceRequest::new("Returns users"))
            .await
            .unwrap();
        assert_eq!(response.meta.parse_mode, ParseMode::Heuristic);
        assert_eq!(response.original_content, "Returns users");
        assert_eq!(response.enhancements.len(), 1);
        assert_eq!(response.enhancements[0].kind, EnhancementType::Addition);
    }

    #[tokio::test]
    async fn test_validate_uses_low_temperature_and_fallback() {
        let (orchestrator, mock) =
            with_mock(MockProvider::new("mock").with_reply(MockReply::text("It looks okay.")));

        let response = orchestrator
            .validate(ValidateRequest::new("GET /users returns users"))
            .await
            .unwrap();
        assert!(response.valid);
        assert_eq!(response.score, 0.7);
        assert_eq!(response.metrics.clarity, 0.7);
        assert_eq!(response.meta.parse_mode, ParseMode::Heuristic);
        assert!(!response.feedback.is_empty());
        assert_eq!(mock.call_count(), 1);

        let (_, options) =
            orchestrator.render(&OperationRequest::Validate(ValidateRequest::new("x")));
        assert_eq!(options.temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_no_provider_is_unavailable() {
        let orchestrator = orchestrator();
        let err = orchestrator.summarize(users_request()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderUnavailable);

        let (orchestrator, _) = with_mock(MockProvider::new("mock"));
        let mut request = users_request();
        request.provider = Some("missing".to_string());
        let err = orchestrator.summarize(request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderUnavailable);
    }

    #[tokio::test]
    async fn test_provider_error_is_wrapped() {
        let (orchestrator, _) =
            with_mock(MockProvider::new("mock").with_reply(MockReply::http_error(503)));

        let err = orchestrator.summarize(users_request()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SummarizationFailed);
        assert!(err.retryable);
        assert_eq!(err.details.unwrap()["statusCode"], 503);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (orchestrator, mock) = with_mock(
            MockProvider::new("mock")
                .with_reply(MockReply::http_error(500))
                .with_default_reply(MockReply::text(SUMMARY_JSON)),
        );

        assert!(orchestrator.summarize(users_request()).await.is_err());
        assert!(orchestrator.summarize(users_request()).await.is_ok());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_delays_extra_request() {
        let options = AiServiceOptions {
            rate_limit: RateLimitConfig::new(60, 2),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(options).unwrap();
        orchestrator
            .register_provider("mock", Arc::new(MockProvider::new("mock")))
            .unwrap();

        let start = tokio::time::Instant::now();
        for content in ["a", "b", "c"] {
            orchestrator
                .enhance(EnhanceRequest::new(content))
                .await
                .unwrap();
        }
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_provider_call() {
        let (orchestrator, _) = with_mock(
            MockProvider::new("mock")
                .with_reply(MockReply::text(SUMMARY_JSON).delayed(Duration::from_secs(30))),
        );
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let err = orchestrator
            .execute(OperationRequest::Summarize(users_request()), &token)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_operations() {
        let (orchestrator, mock) = with_mock(MockProvider::new("mock"));
        orchestrator.shutdown();
        assert!(orchestrator.is_shut_down());

        let err = orchestrator
            .enhance(EnhanceRequest::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_process_continue() {
        let (orchestrator, _) = with_mock(MockProvider::new("mock").with_responder(|prompt| {
            if prompt.contains("item three") {
                MockReply::http_error(400)
            } else {
                MockReply::text(r#"{"enhancedContent": "better", "enhancements": []}"#)
            }
        }));

        let items = ["item one", "item two", "item three", "item four", "item five"]
            .iter()
            .enumerate()
            .map(|(i, content)| {
                BatchItem::new(
                    format!("{}", i + 1),
                    OperationRequest::Enhance(EnhanceRequest::new(*content)),
                )
            })
            .collect();

        let response = orchestrator
            .batch_process(BatchRequest {
                items,
                options: Some(BatchOptions {
                    max_concurrency: 2,
                    failure_strategy: FailureStrategy::Continue,
                }),
            })
            .await
            .unwrap();

        assert_eq!(response.results.len(), 5);
        assert_eq!(response.success_count, 4);
        assert_eq!(response.failure_count, 1);
        assert_eq!(response.status, BatchStatus::Partial);
        assert_eq!(response.total_token_usage.total_tokens, 4 * 180);
    }

    #[test]
    fn test_from_config_registers_providers() {
        let config: Config = toml::from_str(
            r#"
            default_provider = "second"

            [[providers]]
            name = "first"
            kind = "mock"

            [[providers]]
            name = "second"
            kind = "mock"
            "#,
        )
        .unwrap();

        let orchestrator = Orchestrator::from_config(&config).unwrap();
        assert_eq!(orchestrator.registry().names(), vec!["first", "second"]);
        assert_eq!(orchestrator.registry().default_name().as_deref(), Some("second"));
    }
}
