//! Per-provider usage accounting.
//!
//! Each adapter owns one `UsageTracker`; statistics are never shared across
//! providers. Counters are updated once per logical call, after it either
//! succeeds or fails terminally.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::TokenUsage;
use crate::constants::usage as usage_constants;

/// Cumulative usage snapshot for one provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Mean latency over the most recent samples
    pub average_latency_ms: f64,
    /// errors / total_requests
    pub error_rate: f64,
}

#[derive(Debug, Default)]
struct UsageState {
    total_requests: u64,
    total_tokens: u64,
    total_cost: f64,
    errors: u64,
    latencies: VecDeque<u64>,
}

impl UsageState {
    fn push_latency(&mut self, latency_ms: u64) {
        if self.latencies.len() == usage_constants::LATENCY_WINDOW {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency_ms);
    }
}

/// Thread-safe usage tracker owned by a provider instance
#[derive(Debug, Default)]
pub struct UsageTracker {
    state: Mutex<UsageState>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UsageState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Usage tracker mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record a successful call with its token usage
    pub fn record_success(&self, usage: &TokenUsage, latency_ms: u64) {
        let mut state = self.lock();
        state.total_requests += 1;
        state.total_tokens += usage.total_tokens as u64;
        state.total_cost += usage.estimated_cost;
        state.push_latency(latency_ms);
    }

    /// Record a terminal failure
    pub fn record_failure(&self, latency_ms: u64) {
        let mut state = self.lock();
        state.total_requests += 1;
        state.errors += 1;
        state.push_latency(latency_ms);
    }

    pub fn snapshot(&self) -> UsageStats {
        let state = self.lock();
        let average_latency_ms = if state.latencies.is_empty() {
            0.0
        } else {
            state.latencies.iter().sum::<u64>() as f64 / state.latencies.len() as f64
        };
        let error_rate = if state.total_requests == 0 {
            0.0
        } else {
            state.errors as f64 / state.total_requests as f64
        };

        UsageStats {
            total_requests: state.total_requests,
            total_tokens: state.total_tokens,
            total_cost: state.total_cost,
            average_latency_ms,
            error_rate,
        }
    }
}
