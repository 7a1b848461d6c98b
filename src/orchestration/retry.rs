//! # Retry and Backoff Manager
//!
//! Decides, per failed attempt, whether a task retries, fails, or is
//! abandoned, and computes the exponential backoff delay for retries.
//!
//! Policy by failure class:
//! - `Permanent` fails the task immediately; no retry can help.
//! - `Transient` retries with exponential backoff up to the attempt ceiling,
//!   then abandons.
//! - `Unknown` retries under the stricter unknown-failure ceiling.
//!
//! Delays carry full jitter on top of the exponential term so simultaneous
//! failures across platforms do not retry in lockstep.

use std::time::Duration;
use tracing::debug;

use crate::config::BackoffConfig;
use crate::orchestration::types::{FailureClass, TaskFailure};

/// Verdict for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule another attempt after the delay.
    Retry { delay: Duration },
    /// Permanent failure; the task fails now.
    Fail,
    /// Attempt ceiling exhausted; the task is abandoned.
    Abandon,
}

/// Applies the retry policy and computes backoff delays.
#[derive(Debug, Clone)]
pub struct RetryManager {
    config: BackoffConfig,
}

impl RetryManager {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Attempt ceiling for a failure class. The unknown-class ceiling never
    /// exceeds the transient one; config validation enforces the ordering.
    fn attempt_ceiling(&self, class: FailureClass) -> u32 {
        match class {
            FailureClass::Transient => self.config.max_attempts,
            FailureClass::Unknown => self.config.unknown_max_attempts,
            FailureClass::Permanent => 0,
        }
    }

    /// Decide what happens after a failed attempt. `attempts` is the number
    /// of attempts already consumed, including the one that just failed.
    pub fn assess(&self, failure: &TaskFailure, attempts: u32) -> RetryDecision {
        let class = failure.class();
        let decision = match class {
            FailureClass::Permanent => RetryDecision::Fail,
            FailureClass::Transient | FailureClass::Unknown => {
                if attempts >= self.attempt_ceiling(class) {
                    RetryDecision::Abandon
                } else {
                    RetryDecision::Retry {
                        delay: self.backoff_delay(attempts),
                    }
                }
            }
        };
        debug!(
            class = ?class,
            attempts,
            decision = ?decision,
            failure = %failure,
            "Assessed task failure"
        );
        decision
    }

    /// Exponential backoff with full jitter: `base * 2^(attempt - 1)` capped
    /// at the configured maximum, plus up to one base delay of jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let exponential = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.config.max_delay_ms);
        let jitter = if self.config.base_delay_ms > 0 {
            fastrand::u64(0..self.config.base_delay_ms)
        } else {
            0
        };
        Duration::from_millis(exponential.saturating_add(jitter))
    }
}
