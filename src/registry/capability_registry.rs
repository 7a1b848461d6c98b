//! # Capability Registry
//!
//! Maps each platform to the operations it supports, its adapter instance,
//! and its declared rate-limit profile.
//!
//! ## Overview
//!
//! The registry is populated at process start from the configured adapter
//! set and is effectively read-only during normal operation. Updates (for
//! example disabling a platform) replace whole entries behind a write lock,
//! so readers never observe a half-updated descriptor.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swarm_core::registry::CapabilityRegistry;
//! use swarm_core::models::{Operation, Platform};
//!
//! # async fn example(adapter: Arc<dyn swarm_core::adapters::PlatformAdapter>) {
//! let registry = CapabilityRegistry::new();
//! registry.register(adapter).await;
//!
//! if registry.supports(Platform::Facebook, Operation::Publish).await {
//!     let descriptor = registry.resolve(Platform::Facebook).await.unwrap();
//!     println!("burst size: {}", descriptor.rate_limit.burst_size);
//! }
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::adapters::PlatformAdapter;
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::models::{Operation, Platform, RateLimitProfile};

/// Resolved capability entry for one platform.
#[derive(Clone)]
pub struct CapabilityDescriptor {
    pub platform: Platform,
    pub operations: HashSet<Operation>,
    pub rate_limit: RateLimitProfile,
    pub adapter: Arc<dyn PlatformAdapter>,
}

impl std::fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("platform", &self.platform)
            .field("operations", &self.operations)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

/// Registry for platform adapters and their declared capabilities.
pub struct CapabilityRegistry {
    entries: Arc<RwLock<HashMap<Platform, Arc<CapabilityDescriptor>>>>,
    /// Configured fallback for adapters that declare no profile.
    default_profile: Option<RateLimitProfile>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_profile: None,
        }
    }

    /// Registry with a configured fallback rate-limit profile.
    pub fn with_default_profile(default_profile: RateLimitProfile) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_profile: Some(default_profile),
        }
    }

    /// Register an adapter, building its descriptor from the declared
    /// capability set and rate-limit profile. Profile precedence: the
    /// adapter's declaration, then the configured default, then the
    /// platform's built-in quota. Replaces any previous entry for the
    /// platform atomically.
    pub async fn register(&self, adapter: Arc<dyn PlatformAdapter>) {
        let platform = adapter.platform();
        let mut rate_limit = adapter
            .rate_limit_profile()
            .or(self.default_profile)
            .unwrap_or_else(|| platform.default_rate_limit_profile());
        // A zero-burst bucket can never hold a whole token; tasks gated on
        // it would stay pending forever. Clamp to the smallest usable burst.
        if rate_limit.burst_size == 0 {
            warn!(
                platform = %platform,
                "Adapter declared a zero burst size, clamping to 1"
            );
            rate_limit.burst_size = 1;
        }
        let descriptor = Arc::new(CapabilityDescriptor {
            platform,
            operations: adapter.capabilities(),
            rate_limit,
            adapter: Arc::clone(&adapter),
        });

        let mut entries = self.entries.write().await;
        entries.insert(descriptor.platform, Arc::clone(&descriptor));
        info!(
            platform = %descriptor.platform,
            operations = descriptor.operations.len(),
            "Registered platform adapter"
        );
    }

    /// Remove a platform entry, e.g. when an operator disables a platform.
    pub async fn deregister(&self, platform: Platform) -> bool {
        let removed = self.entries.write().await.remove(&platform).is_some();
        if removed {
            info!(platform = %platform, "Deregistered platform adapter");
        }
        removed
    }

    /// Resolve the descriptor for a platform.
    pub async fn resolve(&self, platform: Platform) -> OrchestrationResult<Arc<CapabilityDescriptor>> {
        let entries = self.entries.read().await;
        entries
            .get(&platform)
            .cloned()
            .ok_or(OrchestrationError::UnknownPlatform { platform })
    }

    /// Check whether a platform supports an operation. Absent platforms
    /// support nothing.
    pub async fn supports(&self, platform: Platform, operation: Operation) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(&platform)
            .map(|d| d.operations.contains(&operation))
            .unwrap_or(false)
    }

    /// Platforms currently registered.
    pub async fn registered_platforms(&self) -> Vec<Platform> {
        let entries = self.entries.read().await;
        let mut platforms: Vec<Platform> = entries.keys().copied().collect();
        platforms.sort();
        debug!(count = platforms.len(), "Listed registered platforms");
        platforms
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
