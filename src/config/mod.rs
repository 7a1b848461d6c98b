//! # Configuration System
//!
//! Typed configuration for the orchestration engine, loaded from an optional
//! TOML file with `SWARM_`-prefixed environment overrides. Values are
//! validated explicitly at load time; there are no silent fallbacks beyond
//! the documented defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use swarm_core::config::SwarmConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SwarmConfig::load(None)?;
//! println!("max in-flight tasks: {}", config.execution.max_in_flight_tasks);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SwarmError};
use crate::models::RateLimitProfile;

/// Execution and scheduling limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Global maximum number of in-flight adapter invocations across all
    /// campaigns, protecting the host process.
    pub max_in_flight_tasks: usize,
    /// Maximum wait per dispatched task; exceeding it is a transient
    /// failure.
    pub task_timeout_seconds: u64,
    /// Cooperative scheduling tick; pending tasks denied a rate-limit slot
    /// are re-examined at this cadence.
    pub scheduling_tick_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_in_flight_tasks: 32,
            task_timeout_seconds: 30,
            scheduling_tick_ms: 50,
        }
    }
}

impl ExecutionConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_seconds)
    }

    pub fn scheduling_tick(&self) -> Duration {
        Duration::from_millis(self.scheduling_tick_ms)
    }
}

/// Retry and backoff policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Attempt ceiling for transient failures.
    pub max_attempts: u32,
    /// Stricter ceiling applied to unclassified failures.
    pub unknown_max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 300_000,
            max_attempts: 3,
            unknown_max_attempts: 2,
        }
    }
}

/// Planner inputs left open by policy: how long to wait before collecting
/// analytics for a published post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub analytics_delay_seconds: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            analytics_delay_seconds: 900,
        }
    }
}

/// Rate limiter fallbacks used when an adapter declares no profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Default bucket burst size.
    pub default_burst_size: u32,
    /// Default sustained refill, tokens per second.
    pub default_refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_burst_size: 10,
            default_refill_per_second: 0.5,
        }
    }
}

impl RateLimitConfig {
    pub fn default_profile(&self) -> RateLimitProfile {
        RateLimitProfile::new(self.default_refill_per_second, self.default_burst_size)
    }
}

/// Root configuration for the orchestration engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub execution: ExecutionConfig,
    pub backoff: BackoffConfig,
    pub planner: PlannerConfig,
    pub rate_limits: RateLimitConfig,
}

impl SwarmConfig {
    /// Load configuration from an optional TOML file plus `SWARM_`-prefixed
    /// environment overrides (e.g. `SWARM_EXECUTION__MAX_IN_FLIGHT_TASKS`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SWARM")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: SwarmConfig = builder
            .build()
            .map_err(|e| SwarmError::ConfigurationError(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SwarmError::ConfigurationError(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject configurations that would stall or overwhelm the scheduler.
    pub fn validate(&self) -> Result<()> {
        if self.execution.max_in_flight_tasks == 0 {
            return Err(SwarmError::ConfigurationError(
                "execution.max_in_flight_tasks must be positive".to_string(),
            ));
        }
        if self.execution.task_timeout_seconds == 0 {
            return Err(SwarmError::ConfigurationError(
                "execution.task_timeout_seconds must be positive".to_string(),
            ));
        }
        if self.execution.scheduling_tick_ms == 0 {
            return Err(SwarmError::ConfigurationError(
                "execution.scheduling_tick_ms must be positive".to_string(),
            ));
        }
        if self.backoff.max_attempts == 0 {
            return Err(SwarmError::ConfigurationError(
                "backoff.max_attempts must be positive".to_string(),
            ));
        }
        if self.backoff.unknown_max_attempts > self.backoff.max_attempts {
            return Err(SwarmError::ConfigurationError(
                "backoff.unknown_max_attempts must not exceed backoff.max_attempts".to_string(),
            ));
        }
        if self.backoff.base_delay_ms > self.backoff.max_delay_ms {
            return Err(SwarmError::ConfigurationError(
                "backoff.base_delay_ms must not exceed backoff.max_delay_ms".to_string(),
            ));
        }
        if self.rate_limits.default_refill_per_second <= 0.0 {
            return Err(SwarmError::ConfigurationError(
                "rate_limits.default_refill_per_second must be positive".to_string(),
            ));
        }
        // A zero-burst bucket can never hold a whole token, so every
        // acquisition is denied forever and the campaign livelocks.
        if self.rate_limits.default_burst_size == 0 {
            return Err(SwarmError::ConfigurationError(
                "rate_limits.default_burst_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
