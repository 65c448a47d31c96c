//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Rate limiter constants
pub mod rate_limit {
    /// Default window size (seconds)
    pub const DEFAULT_WINDOW_SECS: u64 = 60;

    /// Default maximum requests admitted per window
    pub const DEFAULT_MAX_REQUESTS: u32 = 60;
}

/// Response cache constants
pub mod cache {
    /// Default maximum number of cached responses
    pub const DEFAULT_MAX_SIZE: usize = 1000;

    /// Default TTL for summaries (seconds)
    pub const SUMMARIZE_TTL_SECS: u64 = 3600;

    /// Default TTL for enhancements (seconds)
    pub const ENHANCE_TTL_SECS: u64 = 1800;

    /// Default TTL for validations (seconds)
    pub const VALIDATE_TTL_SECS: u64 = 600;
}

/// Provider adapter retry constants
pub mod retry {
    /// Default maximum attempts per provider call (first try included)
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1000;

    /// Maximum delay between retries (milliseconds)
    pub const MAX_DELAY_MS: u64 = 10_000;

    /// Default jitter as a fraction of the computed delay
    pub const DEFAULT_JITTER: f64 = 0.25;
}

/// Network constants
pub mod network {
    /// Default per-attempt HTTP timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default max tokens requested from a provider
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
}

/// Usage statistics constants
pub mod usage {
    /// Number of latency samples kept for the rolling average
    pub const LATENCY_WINDOW: usize = 100;
}

/// Orchestrator operation constants
pub mod operation {
    /// Temperature used for validation calls
    pub const VALIDATE_TEMPERATURE: f32 = 0.3;

    /// Score assigned by the validation fallback
    pub const FALLBACK_VALIDATION_SCORE: f64 = 0.7;

    /// Confidence attached to a synthetic enhancement suggestion
    pub const FALLBACK_ENHANCEMENT_CONFIDENCE: f64 = 0.5;
}

/// Confidence scoring constants
pub mod confidence {
    /// Starting score before bonuses
    pub const BASE: f64 = 0.5;

    /// Bonus when the model finished naturally
    pub const STOP_BONUS: f64 = 0.2;

    /// Bonus when the completion is longer than `LENGTH_THRESHOLD` tokens
    pub const LENGTH_BONUS: f64 = 0.1;

    /// Completion token count above which `LENGTH_BONUS` applies
    pub const LENGTH_THRESHOLD: u32 = 50;

    /// Bonus for complex endpoints (parameters or several responses)
    pub const COMPLEXITY_BONUS: f64 = 0.1;
}

/// Batch engine constants
pub mod batch {
    /// Default number of items run concurrently per chunk
    pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
}
