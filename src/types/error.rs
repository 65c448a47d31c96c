//! Unified Error Type System
//!
//! Centralized error types for the entire crate.
//! Provides error classification for retry decisions in provider adapters
//! and the uniform error envelope returned by orchestrator operations.
//!
//! ## Error Categories
//!
//! - **RateLimit / Timeout / Network / ServerError**: transient, retryable
//! - **Auth / BadRequest / NotFound**: permanent backend errors, not retryable
//! - **ParseError**: backend body could not be decoded
//! - **Cancelled**: caller aborted the call

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Backend failure categories used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// HTTP 429
    RateLimit,
    /// HTTP 408 or a local per-attempt timeout
    Timeout,
    /// Connection-level failure before a response arrived
    Network,
    /// HTTP 5xx
    ServerError,
    /// HTTP 401/403
    Auth,
    /// Other HTTP 4xx
    BadRequest,
    /// HTTP 404
    NotFound,
    /// Response body could not be decoded
    ParseError,
    /// Call aborted through a cancellation token
    Cancelled,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Network => write!(f, "NETWORK"),
            Self::ServerError => write!(f, "SERVER_ERROR"),
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Transient categories are worth another attempt on the same provider
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Timeout | Self::Network | Self::ServerError
        )
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Typed error raised by a provider adapter once its retries are exhausted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    /// HTTP status code, when the backend answered
    pub status_code: Option<u16>,
    /// Classified failure type
    pub error_type: ErrorCategory,
    /// Backend-specific error code (e.g. `rate_limit_exceeded`)
    pub error_code: Option<String>,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Whether a later retry could succeed
    pub retryable: bool,
    /// Attempts made before giving up
    pub attempts: u32,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.provider, self.status_code) {
            (Some(provider), Some(status)) => write!(
                f,
                "[{}:{}:{}] {}",
                provider, self.error_type, status, self.message
            ),
            (Some(provider), None) => {
                write!(f, "[{}:{}] {}", provider, self.error_type, self.message)
            }
            (None, _) => write!(f, "[{}] {}", self.error_type, self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Create a new provider error; retryability follows the category
    pub fn new(error_type: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            error_type,
            error_code: None,
            message: message.into(),
            provider: None,
            retryable: error_type.is_retryable(),
            attempts: 1,
        }
    }

    /// Add provider context
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Add HTTP status
    pub fn status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Add backend error code
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Record how many attempts were made
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Error classifier for retry routing
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify HTTP status code
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> ProviderError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            408 => ErrorCategory::Timeout,
            401 | 403 => ErrorCategory::Auth,
            404 => ErrorCategory::NotFound,
            s if s >= 500 => ErrorCategory::ServerError,
            s if s >= 400 => ErrorCategory::BadRequest,
            _ => ErrorCategory::Unknown,
        };
        ProviderError::new(category, message)
            .provider(provider)
            .status(status)
    }

    /// Classify a transport error raised by the HTTP client
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> ProviderError {
        let category = if err.is_timeout() {
            ErrorCategory::Timeout
        } else if err.is_connect() || err.is_request() {
            ErrorCategory::Network
        } else if err.is_decode() {
            ErrorCategory::ParseError
        } else {
            ErrorCategory::Unknown
        };
        let mut classified = ProviderError::new(category, err.to_string()).provider(provider);
        if let Some(status) = err.status() {
            classified = classified.status(status.as_u16());
        }
        classified
    }

    /// Classify a crate error into a provider error
    pub fn classify_error(err: &ApiDocError, provider: &str) -> ProviderError {
        match err {
            ApiDocError::Provider(e) => e.clone(),
            ApiDocError::Timeout { .. } => {
                ProviderError::new(ErrorCategory::Timeout, err.to_string()).provider(provider)
            }
            ApiDocError::Cancelled => {
                ProviderError::new(ErrorCategory::Cancelled, err.to_string()).provider(provider)
            }
            ApiDocError::Json(_) => {
                ProviderError::new(ErrorCategory::ParseError, err.to_string()).provider(provider)
            }
            ApiDocError::Io(_) => {
                ProviderError::new(ErrorCategory::Network, err.to_string()).provider(provider)
            }
            _ => ProviderError::new(ErrorCategory::Unknown, err.to_string()).provider(provider),
        }
    }
}

// =============================================================================
// Operation Error
// =============================================================================

/// Error codes surfaced by orchestrator operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SummarizationFailed,
    EnhancementFailed,
    ValidationFailed,
    BatchProcessingFailed,
    ProviderUnavailable,
    Cancelled,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SummarizationFailed => "SUMMARIZATION_FAILED",
            Self::EnhancementFailed => "ENHANCEMENT_FAILED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::BatchProcessingFailed => "BATCH_PROCESSING_FAILED",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Always `"error"`; keeps the serialized envelope self-describing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStatus {
    #[default]
    Error,
}

/// Uniform error envelope returned by orchestrator operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    pub status: ErrorStatus,
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for OperationError {}

impl OperationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: ErrorStatus::Error,
            code,
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Wrap a lower-level failure under an operation's error code.
    ///
    /// Cancellation and missing providers keep their own codes so callers
    /// can tell them apart from backend failures.
    pub fn wrap(code: ErrorCode, err: &ApiDocError) -> Self {
        match err {
            ApiDocError::Cancelled => Self::new(ErrorCode::Cancelled, err.to_string()),
            ApiDocError::ProviderUnavailable(_) => {
                Self::new(ErrorCode::ProviderUnavailable, err.to_string())
            }
            ApiDocError::Operation(inner) => inner.clone(),
            ApiDocError::Provider(provider_err) => Self::new(code, err.to_string())
                .retryable(provider_err.retryable)
                .with_details(serde_json::json!({
                    "provider": provider_err.provider,
                    "statusCode": provider_err.status_code,
                    "errorType": provider_err.error_type,
                    "errorCode": provider_err.error_code,
                    "attempts": provider_err.attempts,
                })),
            ApiDocError::Timeout { .. } => Self::new(code, err.to_string()).retryable(true),
            _ => Self::new(code, err.to_string()),
        }
    }
}

// =============================================================================
// Crate Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ApiDocError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Provider Errors
    // -------------------------------------------------------------------------
    /// Typed backend failure after adapter retries
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// No default provider registered, or lookup miss
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider already registered: {0}")]
    DuplicateProvider(String),

    /// Per-attempt timeout
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Operation(OperationError),
}

impl From<ProviderError> for ApiDocError {
    fn from(err: ProviderError) -> Self {
        ApiDocError::Provider(err)
    }
}

impl From<OperationError> for ApiDocError {
    fn from(err: OperationError) -> Self {
        ApiDocError::Operation(err)
    }
}

pub type Result<T> = std::result::Result<T, ApiDocError>;

impl ApiDocError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Check if this error can be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Operation(e) => e.retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::ServerError.to_string(), "SERVER_ERROR");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Timeout.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::ServerError.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::Cancelled.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "test");
        assert_eq!(rate_limit.error_type, ErrorCategory::RateLimit);
        assert!(rate_limit.retryable);

        let timeout = ErrorClassifier::classify_http_status(408, "Request timeout", "test");
        assert!(timeout.retryable);

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "test");
        assert_eq!(auth.error_type, ErrorCategory::Auth);
        assert!(!auth.retryable);

        let bad = ErrorClassifier::classify_http_status(422, "Unprocessable", "test");
        assert_eq!(bad.error_type, ErrorCategory::BadRequest);
        assert!(!bad.retryable);

        let server_error = ErrorClassifier::classify_http_status(503, "Unavailable", "test");
        assert_eq!(server_error.error_type, ErrorCategory::ServerError);
        assert_eq!(server_error.status_code, Some(503));
        assert!(server_error.retryable);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ErrorCategory::RateLimit, "Too many requests")
            .provider("openai")
            .status(429);
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT:429] Too many requests");

        let err_no_provider = ProviderError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_wrap_preserves_retryable() {
        let provider_err = ProviderError::new(ErrorCategory::ServerError, "boom")
            .provider("openai")
            .status(500)
            .attempts(3);
        let wrapped = OperationError::wrap(
            ErrorCode::SummarizationFailed,
            &ApiDocError::Provider(provider_err),
        );
        assert_eq!(wrapped.code, ErrorCode::SummarizationFailed);
        assert!(wrapped.retryable);
        let details = wrapped.details.unwrap();
        assert_eq!(details["statusCode"], 500);
        assert_eq!(details["attempts"], 3);
    }

    #[test]
    fn test_wrap_keeps_cancellation_code() {
        let wrapped = OperationError::wrap(ErrorCode::EnhancementFailed, &ApiDocError::Cancelled);
        assert_eq!(wrapped.code, ErrorCode::Cancelled);
        assert!(!wrapped.retryable);
    }

    #[test]
    fn test_operation_error_serialization() {
        let err = OperationError::new(ErrorCode::ValidationFailed, "bad");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "VALIDATION_FAILED");
        assert_eq!(json["retryable"], false);
        assert!(json.get("details").is_none());
    }
}
