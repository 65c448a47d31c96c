//! Fixed-window request rate limiting.
//!
//! A single window counter shared by every caller of one orchestrator.
//! Callers over capacity are delayed until the window rolls over, never
//! rejected. Check-and-increment happens under one lock so concurrent callers
//! cannot overshoot the limit.
//!
//! Token-rate limiting is advisory: `record_tokens` tracks consumption and
//! logs when the configured budget is exceeded, but never blocks.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::constants::rate_limit as rate_constants;

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in seconds
    pub window_secs: u64,
    /// Requests admitted per window
    pub max_requests: u32,
    /// Advisory token budget per window
    pub tokens_per_window: Option<u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: rate_constants::DEFAULT_WINDOW_SECS,
            max_requests: rate_constants::DEFAULT_MAX_REQUESTS,
            tokens_per_window: None,
        }
    }
}

impl RateLimitConfig {
    pub fn new(window_secs: u64, max_requests: u32) -> Self {
        Self {
            window_secs,
            max_requests,
            tokens_per_window: None,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Current window state
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
    tokens: u64,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            tokens: 0,
        }
    }
}

/// Point-in-time view of the limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub count: u32,
    pub max_requests: u32,
    /// Time until the current window resets
    pub resets_in: Duration,
    pub tokens: u64,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<RateWindow>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            window: Mutex::new(RateWindow::new(Instant::now())),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateWindow> {
        self.window.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Rate limiter mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Reset the window if it has fully elapsed
    fn roll_over(&self, window: &mut RateWindow, now: Instant) {
        if now.duration_since(window.window_start) >= self.config.window() {
            *window = RateWindow::new(now);
        }
    }

    /// Try to take a slot; on failure return how long until the window resets
    fn try_acquire(&self) -> Result<(), Duration> {
        let mut window = self.lock();
        let now = Instant::now();
        self.roll_over(&mut window, now);

        if window.count >= self.config.max_requests {
            let elapsed = now.duration_since(window.window_start);
            return Err(self.config.window().saturating_sub(elapsed));
        }

        window.count += 1;
        Ok(())
    }

    /// Wait until a request slot is available, then take it.
    ///
    /// Returns the total time spent waiting.
    pub async fn wait_for_capacity(&self) -> Duration {
        let start = Instant::now();
        loop {
            match self.try_acquire() {
                Ok(()) => return start.elapsed(),
                Err(remaining) => {
                    debug!(
                        wait_ms = remaining.as_millis() as u64,
                        max_requests = self.config.max_requests,
                        "Rate limit reached, waiting for window rollover"
                    );
                    // A zero remainder still yields so the window can roll over
                    sleep(remaining.max(Duration::from_millis(1))).await;
                }
            }
        }
    }

    /// Record tokens consumed in the current window (advisory only)
    pub fn record_tokens(&self, tokens: u64) {
        let mut window = self.lock();
        let now = Instant::now();
        self.roll_over(&mut window, now);
        window.tokens += tokens;

        if let Some(budget) = self.config.tokens_per_window
            && window.tokens > budget
        {
            warn!(
                tokens = window.tokens,
                budget, "Advisory token budget exceeded for current window"
            );
        }
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        let mut window = self.lock();
        let now = Instant::now();
        self.roll_over(&mut window, now);
        let elapsed = now.duration_since(window.window_start);

        RateLimitSnapshot {
            count: window.count,
            max_requests: self.config.max_requests,
            resets_in: self.config.window().saturating_sub(elapsed),
            tokens: window.tokens,
        }
    }
}
