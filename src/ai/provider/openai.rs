//! OpenAI API Provider
//!
//! Adapter for OpenAI-compatible Chat Completions endpoints (OpenAI itself,
//! Azure-style gateways, vLLM, LM Studio...). Every attempt is bounded by the
//! per-attempt timeout and retried through the shared [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    AiProvider, Capability, ChatMessage, CompletionOptions, CompletionResult, FinishReason,
    GENERAL_CAPABILITIES, ModelPricing, ProviderConfig, RetryPolicy, TokenUsage, UsageStats,
    UsageTracker,
};
use crate::ai::timeout::with_timeout;
use crate::types::{ApiDocError, ErrorCategory, ErrorClassifier, ProviderError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    name: String,
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    pricing: ModelPricing,
    retry: RetryPolicy,
    usage: UsageTracker,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ApiDocError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiDocError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: config.name,
            api_key: SecretString::from(api_key_str),
            api_base,
            pricing: ModelPricing::for_model(&model),
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::new(config.retry),
            usage: UsageTracker::new(),
            client,
        })
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &'a CompletionOptions,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: options.temperature.unwrap_or(self.temperature),
            max_tokens: Some(options.max_tokens.unwrap_or(self.max_tokens)),
            top_p: options.top_p,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            stop: if options.stop.is_empty() {
                None
            } else {
                Some(&options.stop)
            },
            // Whole responses only
            stream: false,
        }
    }

    /// One HTTP round trip, no retry
    async fn send_once(&self, request: &ChatCompletionRequest<'_>) -> Result<CompletionResult> {
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, &self.name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.api_error(status.as_u16(), &body).into());
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, &self.name))?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            ProviderError::new(ErrorCategory::ParseError, "No choices in OpenAI response")
                .provider(&self.name)
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default()
            .priced(&self.pricing);

        Ok(CompletionResult {
            text: choice.message.content.unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::parse)
                .unwrap_or(FinishReason::Other("unknown".to_string())),
            usage,
            model: body.model.unwrap_or_else(|| self.model.clone()),
            response_id: body.id.unwrap_or_default(),
            created_at: body
                .created
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now),
        })
    }

    /// Classify a non-2xx response, keeping OpenAI's error code when present
    fn api_error(&self, status: u16, body: &str) -> ProviderError {
        let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| b.error.message.clone())
            .unwrap_or_else(|| body.chars().take(500).collect());

        let mut err = ErrorClassifier::classify_http_status(status, &message, &self.name);
        if let Some(code) = parsed.and_then(|b| b.error.code.or(b.error.error_type)) {
            err = err.code(code);
        }
        err
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> &[Capability] {
        GENERAL_CAPABILITIES
    }

    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<CompletionResult> {
        let messages = options.prompt_messages(prompt);
        self.chat(&messages, options).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        debug!(
            provider = %self.name,
            model = %self.model,
            messages = messages.len(),
            "Sending chat completion"
        );

        let start = Instant::now();
        let request = self.build_request(messages, options);
        let result = self
            .retry
            .run(&self.name, |_| {
                with_timeout(self.timeout, self.send_once(&request), "openai chat completion")
            })
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(completion) => {
                self.usage.record_success(&completion.usage, latency_ms);
                info!(
                    provider = %self.name,
                    prompt_tokens = completion.usage.prompt_tokens,
                    completion_tokens = completion.usage.completion_tokens,
                    latency_ms,
                    "Chat completion finished"
                );
            }
            Err(_) => self.usage.record_failure(latency_ms),
        }
        result
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .timeout(self.timeout)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(provider = %self.name, "OpenAI API check failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!(provider = %self.name, "OpenAI API check failed: {}", e);
                false
            }
        }
    }

    fn usage_stats(&self) -> UsageStats {
        self.usage.snapshot()
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    id: Option<String>,
    created: Option<i64>,
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::RetryConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig {
            name: "openai".to_string(),
            model: Some("gpt-4o".to_string()),
            api_key: Some("sk-test".to_string()),
            api_base: Some(server.uri()),
            retry: RetryConfig {
                base_delay_ms: 10,
                max_delay_ms: 100,
                jitter: 0.0,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap()
    }

    fn success_body() -> serde_json::Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"summary\": \"Lists users\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 1000, "completion_tokens": 80, "total_tokens": 1080}
        })
    }

    #[tokio::test]
    async fn test_complete_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider
            .complete("Summarize GET /users", &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(result.text, "{\"summary\": \"Lists users\"}");
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.response_id, "chatcmpl-123");
        assert_eq!(result.model, "gpt-4o-2024-08-06");
        assert_eq!(result.usage.total_tokens, 1080);
        assert!(result.usage.estimated_cost > 0.0);
        assert_eq!(result.created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_two_server_errors_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider
            .complete("hello", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.finish_reason, FinishReason::Stop);

        // One logical call, recorded once
        let stats = provider.usage_stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.error_rate, 0.0);
        assert_eq!(stats.total_tokens, 1080);
    }

    #[tokio::test]
    async fn test_bad_request_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "Invalid 'messages'",
                    "type": "invalid_request_error",
                    "code": "invalid_value"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .complete("hello", &CompletionOptions::default())
            .await
            .unwrap_err();

        match err {
            ApiDocError::Provider(e) => {
                assert_eq!(e.status_code, Some(400));
                assert_eq!(e.error_type, ErrorCategory::BadRequest);
                assert_eq!(e.error_code.as_deref(), Some("invalid_value"));
                assert_eq!(e.message, "Invalid 'messages'");
                assert_eq!(e.attempts, 1);
                assert!(!e.retryable);
            }
            other => panic!("expected provider error, got {:?}", other),
        }

        let stats = provider.usage_stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.error_rate, 1.0);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_keeps_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(3)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .complete("hello", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        match err {
            ApiDocError::Provider(e) => {
                assert_eq!(e.error_type, ErrorCategory::RateLimit);
                assert_eq!(e.attempts, 3);
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_is_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        assert!(provider_for(&server).is_available().await);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        // SAFETY: tests in this module do not read OPENAI_API_KEY concurrently
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
        let result = OpenAiProvider::new(ProviderConfig::default());
        assert!(matches!(result, Err(ApiDocError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenAiProvider::new(ProviderConfig {
            api_key: Some("sk-very-secret".to_string()),
            ..Default::default()
        })
        .unwrap();
        let debug = format!("{:?}", provider);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-very-secret"));
    }
}
