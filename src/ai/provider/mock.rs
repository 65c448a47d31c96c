//! Scripted test double.
//!
//! `MockProvider` answers from a queue of [`MockReply`] values, falling back
//! to an optional responder closure and then to a default reply. It counts
//! calls and records prompts so tests can assert what the orchestrator sent
//! and whether it reached the provider at all.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use super::{
    AiProvider, Capability, ChatMessage, CompletionOptions, CompletionResult, FinishReason,
    GENERAL_CAPABILITIES, TokenUsage, UsageStats, UsageTracker,
};
use crate::types::{ErrorClassifier, ProviderError, Result};

/// One scripted answer
#[derive(Debug, Clone)]
pub enum MockReply {
    Completion {
        text: String,
        finish_reason: FinishReason,
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    Error(ProviderError),
    /// Wait before producing the inner reply
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// Naturally stopped completion with 80 completion tokens
    pub fn text(text: impl Into<String>) -> Self {
        Self::Completion {
            text: text.into(),
            finish_reason: FinishReason::Stop,
            prompt_tokens: 100,
            completion_tokens: 80,
        }
    }

    pub fn completion(
        text: impl Into<String>,
        finish_reason: FinishReason,
        completion_tokens: u32,
    ) -> Self {
        Self::Completion {
            text: text.into(),
            finish_reason,
            prompt_tokens: 100,
            completion_tokens,
        }
    }

    /// Failure classified as if the backend answered with `status`
    pub fn http_error(status: u16) -> Self {
        Self::Error(ErrorClassifier::classify_http_status(
            status,
            &format!("mock HTTP {}", status),
            "mock",
        ))
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

type Responder = Arc<dyn Fn(&str) -> MockReply + Send + Sync>;

pub struct MockProvider {
    name: String,
    model: String,
    capabilities: Vec<Capability>,
    replies: Mutex<VecDeque<MockReply>>,
    responder: Option<Responder>,
    default_reply: MockReply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    available: AtomicBool,
    usage: UsageTracker,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("calls", &self.call_count())
            .finish()
    }
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: "mock-model".to_string(),
            capabilities: GENERAL_CAPABILITIES.to_vec(),
            replies: Mutex::new(VecDeque::new()),
            responder: None,
            default_reply: MockReply::text("{}"),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            usage: UsageTracker::new(),
        }
    }

    /// Queue a reply; queued replies are consumed in order
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push_reply(reply);
        self
    }

    /// Compute replies from the last message's content
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> MockReply + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Reply used once the queue is empty and no responder is set
    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn push_reply(&self, reply: MockReply) {
        lock(&self.replies).push_back(reply);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    fn next_reply(&self, prompt: &str) -> MockReply {
        if let Some(reply) = lock(&self.replies).pop_front() {
            return reply;
        }
        match &self.responder {
            Some(responder) => responder(prompt),
            None => self.default_reply.clone(),
        }
    }

    async fn resolve(&self, reply: MockReply) -> Result<CompletionResult> {
        let mut reply = reply;
        loop {
            match reply {
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                MockReply::Error(err) => return Err(err.provider(&self.name).into()),
                MockReply::Completion {
                    text,
                    finish_reason,
                    prompt_tokens,
                    completion_tokens,
                } => {
                    return Ok(CompletionResult {
                        text,
                        finish_reason,
                        usage: TokenUsage::new(prompt_tokens, completion_tokens),
                        model: self.model.clone(),
                        response_id: format!("mock-{}", self.call_count()),
                        created_at: Utc::now(),
                    });
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<CompletionResult> {
        let messages = options.prompt_messages(prompt);
        self.chat(&messages, options).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        lock(&self.prompts).push(prompt.clone());

        let start = Instant::now();
        let reply = self.next_reply(&prompt);
        let result = self.resolve(reply).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(completion) => self.usage.record_success(&completion.usage, latency_ms),
            Err(_) => self.usage.record_failure(latency_ms),
        }
        result
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn usage_stats(&self) -> UsageStats {
        self.usage.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiDocError, ErrorCategory};

    #[tokio::test]
    async fn test_queue_then_default() {
        let provider = MockProvider::new("mock")
            .with_reply(MockReply::text("first"))
            .with_default_reply(MockReply::text("default"));
        let options = CompletionOptions::default();

        assert_eq!(provider.complete("a", &options).await.unwrap().text, "first");
        assert_eq!(provider.complete("b", &options).await.unwrap().text, "default");
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let provider = MockProvider::new("mock").with_responder(|prompt| {
            if prompt.contains("fail") {
                MockReply::http_error(500)
            } else {
                MockReply::text("ok")
            }
        });
        let options = CompletionOptions::default();

        assert!(provider.complete("fine", &options).await.is_ok());
        match provider.complete("please fail", &options).await {
            Err(ApiDocError::Provider(e)) => {
                assert_eq!(e.error_type, ErrorCategory::ServerError);
                assert_eq!(e.provider.as_deref(), Some("mock"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
        assert_eq!(provider.usage_stats().error_rate, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply() {
        let provider = MockProvider::new("mock")
            .with_reply(MockReply::text("late").delayed(Duration::from_secs(5)));
        let start = Instant::now();
        let result = provider
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.text, "late");
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
