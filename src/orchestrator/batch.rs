//! Batch Engine
//!
//! Runs many operation requests under bounded concurrency.
//!
//! ## Execution Model
//!
//! Items are split into chunks of `max_concurrency`. Chunks run strictly one
//! after another; items inside a chunk run concurrently, so result order is
//! chunk-sequential but unordered within a chunk.
//!
//! ## Failure Strategies
//!
//! - `continue`: every outcome is recorded, one result per input item
//! - `stop-on-error`: the first failure aborts the batch with a single
//!   `BATCH_PROCESSING_FAILED` error; in-flight siblings are dropped and later
//!   chunks never start

use std::future::Future;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::ai::provider::TokenUsage;
use crate::types::{
    BatchItem, BatchOptions, BatchResponse, BatchResult, BatchStatus, ErrorCode, FailureStrategy,
    OperationError, OperationRequest, OperationResponse,
};

pub type OperationResult<T> = std::result::Result<T, OperationError>;

#[derive(Debug, Clone)]
pub struct BatchEngine {
    options: BatchOptions,
}

impl BatchEngine {
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run `items` through `execute`, one call per item.
    #[instrument(
        skip(self, items, execute),
        fields(
            items = items.len(),
            max_concurrency = self.options.max_concurrency,
            strategy = ?self.options.failure_strategy,
        )
    )]
    pub async fn run<F, Fut>(
        &self,
        items: Vec<BatchItem>,
        execute: F,
    ) -> OperationResult<BatchResponse>
    where
        F: Fn(OperationRequest) -> Fut,
        Fut: Future<Output = OperationResult<OperationResponse>>,
    {
        let max_concurrency = self.options.max_concurrency;
        if max_concurrency == 0 {
            return Err(OperationError::new(
                ErrorCode::BatchProcessingFailed,
                "maxConcurrency must be greater than 0",
            ));
        }

        let start = Instant::now();
        let total = items.len();
        let mut results: Vec<BatchResult> = Vec::with_capacity(total);
        let mut remaining = items.into_iter();

        for chunk_index in 0.. {
            let chunk: Vec<BatchItem> = remaining.by_ref().take(max_concurrency).collect();
            if chunk.is_empty() {
                break;
            }

            let execute = &execute;
            let mut outcomes = stream::iter(chunk)
                .map(|item| async move {
                    let outcome = execute(item.operation).await;
                    (item.id, outcome)
                })
                .buffer_unordered(max_concurrency);

            while let Some((id, outcome)) = outcomes.next().await {
                match outcome {
                    Ok(response) => results.push(BatchResult::success(id, response)),
                    Err(error) => {
                        warn!(item = %id, chunk = chunk_index, error = %error, "Batch item failed");

                        if self.options.failure_strategy == FailureStrategy::StopOnError {
                            let completed = results.len();
                            return Err(OperationError::new(
                                ErrorCode::BatchProcessingFailed,
                                format!("Batch stopped at item '{}': {}", id, error.message),
                            )
                            .retryable(error.retryable)
                            .with_details(json!({
                                "failedItem": id,
                                "completed": completed,
                                "total": total,
                                "cause": error,
                            })));
                        }
                        results.push(BatchResult::failure(id, error));
                    }
                }
            }
        }

        let success_count = results.iter().filter(|r| r.is_success()).count();
        let failure_count = results.len() - success_count;

        let mut total_token_usage = TokenUsage::default();
        for response in results.iter().filter_map(|r| r.result.as_ref()) {
            total_token_usage.add(&response.meta().usage);
        }

        let status = BatchStatus::from_counts(success_count, failure_count);
        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            success_count,
            failure_count,
            status = ?status,
            processing_time_ms,
            "Batch finished"
        );

        Ok(BatchResponse {
            id: uuid::Uuid::new_v4().to_string(),
            status,
            results,
            success_count,
            failure_count,
            total_token_usage,
            processing_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnhanceRequest, EnhanceResponse, ItemStatus, ParseMode, ResponseMeta};
    use std::sync::Mutex;
    use std::time::Duration;

    fn item(id: &str) -> BatchItem {
        BatchItem::new(id, OperationRequest::Enhance(EnhanceRequest::new(id)))
    }

    fn items(n: usize) -> Vec<BatchItem> {
        (1..=n).map(|i| item(&format!("item-{}", i))).collect()
    }

    fn response(content: &str) -> OperationResponse {
        OperationResponse::Enhance(EnhanceResponse {
            meta: ResponseMeta {
                id: "test".to_string(),
                provider: "mock".to_string(),
                model: "mock-model".to_string(),
                usage: TokenUsage::new(10, 5),
                processing_time_ms: 1,
                cached: false,
                parse_mode: ParseMode::Structured,
                created_at: chrono::Utc::now(),
            },
            original_content: content.to_string(),
            enhanced_content: content.to_string(),
            enhancements: Vec::new(),
        })
    }

    fn content(request: &OperationRequest) -> String {
        match request {
            OperationRequest::Enhance(r) => r.content.clone(),
            _ => String::new(),
        }
    }

    /// Succeeds unless the content is in `failing`; records what ran
    async fn run_item(
        request: OperationRequest,
        failing: &[&str],
        seen: &Mutex<Vec<String>>,
    ) -> OperationResult<OperationResponse> {
        let id = content(&request);
        seen.lock().unwrap().push(id.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        if failing.contains(&id.as_str()) {
            Err(OperationError::new(ErrorCode::EnhancementFailed, "boom"))
        } else {
            Ok(response(&id))
        }
    }

    fn engine(max_concurrency: usize, failure_strategy: FailureStrategy) -> BatchEngine {
        BatchEngine::new(BatchOptions {
            max_concurrency,
            failure_strategy,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_records_partial_failure() {
        let seen = Mutex::new(Vec::new());
        let response = engine(2, FailureStrategy::Continue)
            .run(items(5), |r| run_item(r, &["item-3"], &seen))
            .await
            .unwrap();

        assert_eq!(response.results.len(), 5);
        assert_eq!(response.success_count, 4);
        assert_eq!(response.failure_count, 1);
        assert_eq!(response.status, BatchStatus::Partial);
        assert_eq!(response.total_token_usage.total_tokens, 4 * 15);

        let failed: Vec<_> = response
            .results
            .iter()
            .filter(|r| r.status == ItemStatus::Error)
            .collect();
        assert_eq!(failed[0].id, "item-3");
        assert_eq!(
            failed[0].error.as_ref().unwrap().code,
            ErrorCode::EnhancementFailed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_are_chunk_sequential() {
        let seen = Mutex::new(Vec::new());
        let response = engine(2, FailureStrategy::Continue)
            .run(items(5), |r| run_item(r, &[], &seen))
            .await
            .unwrap();

        let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
        let mut first_chunk = ids[..2].to_vec();
        first_chunk.sort();
        assert_eq!(first_chunk, vec!["item-1", "item-2"]);
        let mut second_chunk = ids[2..4].to_vec();
        second_chunk.sort();
        assert_eq!(second_chunk, vec!["item-3", "item-4"]);
        assert_eq!(ids[4], "item-5");
        assert_eq!(response.status, BatchStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_error_skips_later_chunks() {
        let seen = Mutex::new(Vec::new());
        let err = engine(2, FailureStrategy::StopOnError)
            .run(items(5), |r| run_item(r, &["item-3"], &seen))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::BatchProcessingFailed);
        let details = err.details.unwrap();
        assert_eq!(details["failedItem"], "item-3");
        assert_eq!(details["total"], 5);

        // Chunk 3 (item-5) never started
        let seen = seen.lock().unwrap();
        assert!(!seen.contains(&"item-5".to_string()));
        assert!(seen.contains(&"item-1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed() {
        let seen = Mutex::new(Vec::new());
        let response = engine(3, FailureStrategy::Continue)
            .run(items(2), |r| run_item(r, &["item-1", "item-2"], &seen))
            .await
            .unwrap();
        assert_eq!(response.status, BatchStatus::Failed);
        assert_eq!(response.total_token_usage, TokenUsage::default());
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let seen = Mutex::new(Vec::new());
        let err = engine(0, FailureStrategy::Continue)
            .run(items(1), |r| run_item(r, &[], &seen))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchProcessingFailed);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_completes() {
        let seen = Mutex::new(Vec::new());
        let response = engine(2, FailureStrategy::Continue)
            .run(Vec::new(), |r| run_item(r, &[], &seen))
            .await
            .unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.status, BatchStatus::Completed);
    }
}
