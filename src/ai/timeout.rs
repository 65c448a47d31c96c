//! Timeout and cancellation helpers for suspension points.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{with_timeout, with_cancel};
//!
//! let result = with_timeout(
//!     Duration::from_secs(30),
//!     async { /* one provider attempt */ },
//!     "openai chat completion"
//! ).await?;
//!
//! let result = with_cancel(&token, async { /* rate-limit wait + call */ }).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::types::{ApiDocError, Result};

/// Execute an async operation with a timeout
///
/// Returns `ApiDocError::Timeout` if the operation doesn't complete within
/// the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ApiDocError::timeout(operation_name, timeout)),
    }
}

/// Execute an async operation unless `token` is cancelled first.
///
/// On cancellation the inner future is dropped, which aborts any pending
/// network call or sleep it was suspended on.
pub async fn with_cancel<T, F>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiDocError::Cancelled),
        result = future => result,
    }
}
