//! Ollama Local LLM Provider
//!
//! Adapter for a locally running Ollama server (`/api/chat`). Token counts
//! come from `prompt_eval_count` / `eval_count`; local models have no cost.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    AiProvider, Capability, ChatMessage, CompletionOptions, CompletionResult, FinishReason,
    ProviderConfig, RetryPolicy, TokenUsage, UsageStats, UsageTracker,
};
use crate::ai::timeout::with_timeout;
use crate::types::{ApiDocError, ErrorClassifier, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3:latest";

/// Local models rarely translate well; everything else is supported
const OLLAMA_CAPABILITIES: &[Capability] = &[
    Capability::TextCompletion,
    Capability::ChatCompletion,
    Capability::CodeGeneration,
    Capability::Summarization,
    Capability::Analysis,
];

/// Ollama Local LLM Provider
pub struct OllamaProvider {
    name: String,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
    usage: UsageTracker,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        // Validate endpoint URL for security (SSRF prevention)
        let api_base = Self::validate_endpoint(&api_base)?;

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiDocError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: config.name,
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::new(config.retry),
            usage: UsageTracker::new(),
            client,
        })
    }

    /// Validate endpoint URL for security (SSRF prevention)
    ///
    /// Only allows http/https schemes and warns for non-localhost endpoints.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            ApiDocError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiDocError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &'a CompletionOptions,
    ) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature.unwrap_or(self.temperature),
                num_predict: options.max_tokens.unwrap_or(self.max_tokens),
                top_p: options.top_p,
                frequency_penalty: options.frequency_penalty,
                presence_penalty: options.presence_penalty,
                stop: if options.stop.is_empty() {
                    None
                } else {
                    Some(&options.stop)
                },
            },
        }
    }

    async fn send_once(&self, request: &OllamaChatRequest<'_>) -> Result<CompletionResult> {
        let url = format!("{}/api/chat", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    debug!(
                        "Failed to connect to Ollama at {}. Is Ollama running?",
                        self.api_base
                    );
                }
                ErrorClassifier::classify_transport(&e, &self.name)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(
                ErrorClassifier::classify_http_status(status.as_u16(), &message, &self.name).into(),
            );
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, &self.name))?;

        Ok(CompletionResult {
            text: body.message.map(|m| m.content).unwrap_or_default(),
            finish_reason: body
                .done_reason
                .as_deref()
                .map(FinishReason::parse)
                .unwrap_or(if body.done {
                    FinishReason::Stop
                } else {
                    FinishReason::Other("incomplete".to_string())
                }),
            // Local model, no API cost
            usage: TokenUsage::new(
                body.prompt_eval_count.unwrap_or(0),
                body.eval_count.unwrap_or(0),
            ),
            model: body.model.unwrap_or_else(|| self.model.clone()),
            response_id: String::new(),
            created_at: body
                .created_at
                .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
                .map(|ts| ts.with_timezone(&Utc))
                .unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl AiProvider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> &[Capability] {
        OLLAMA_CAPABILITIES
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
        debug!(provider = %self.name, model = %self.model, "Sending Ollama chat request");

        let start = Instant::now();
        let request = self.build_request(messages, options);
        let result = self
            .retry
            .run(&self.name, |_| {
                with_timeout(self.timeout, self.send_once(&request), "ollama chat")
            })
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(completion) => {
                self.usage.record_success(&completion.usage, latency_ms);
                info!(
                    provider = %self.name,
                    completion_tokens = completion.usage.completion_tokens,
                    latency_ms,
                    "Ollama chat finished"
                );
            }
            Err(_) => self.usage.record_failure(latency_ms),
        }
        result
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.api_base);

        let response = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!(provider = %self.name, "Ollama check failed: {}", resp.status());
                return false;
            }
            Err(e) => {
                warn!(provider = %self.name, "Ollama not reachable: {}", e);
                return false;
            }
        };

        match response.json::<OllamaTagsResponse>().await {
            Ok(tags) => {
                let wanted = self.model.trim_end_matches(":latest");
                let available = tags
                    .models
                    .iter()
                    .any(|m| m.name == self.model || m.name.starts_with(wanted));
                if !available {
                    warn!(
                        "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                }
                available
            }
            Err(e) => {
                warn!(provider = %self.name, "Unexpected Ollama tags response: {}", e);
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
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions<'a>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions<'a> {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: Option<String>,
    created_at: Option<String>,
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}
