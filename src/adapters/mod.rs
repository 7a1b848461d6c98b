//! # External Adapter Contracts
//!
//! Trait seams for every external collaborator: platform adapters, the
//! content generation service, the CRM adapter, and the compliance hook.
//! Concrete wire clients live outside the core; the orchestrator only ever
//! sees these contracts and the error taxonomy below.
//!
//! ## Error classification
//!
//! Adapters report failures as [`AdapterError`] with an explicit class:
//! `Transient` (network timeout, 5xx, platform-side rate rejection),
//! `Permanent` (auth failure, validation rejection), or `Unknown`. The
//! Retry/Backoff manager keys its policy off this class; adapters that
//! cannot classify should report `Unknown`, which retries under a stricter
//! ceiling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AnalyticsSnapshot, CampaignBrief, CampaignReport, ClientAccount, ContentArtifact, Operation,
    Platform, PlatformConstraints, PublishResult, RateLimitProfile,
};

/// Failure reported by an external adapter.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum AdapterError {
    /// May succeed on retry: network timeout, 5xx, platform rate rejection.
    #[error("Transient adapter failure: {message}")]
    Transient { message: String },

    /// Will never succeed if retried: auth failure, validation rejection.
    #[error("Permanent adapter failure: {message}")]
    Permanent {
        message: String,
        error_code: Option<String>,
    },

    /// Unclassified failure; retried conservatively.
    #[error("Unclassified adapter failure: {message}")]
    Unknown { message: String },
}

impl AdapterError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            error_code: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }
}

/// Content generation failures share the adapter taxonomy.
pub type GenerationError = AdapterError;

/// Integration implementing publish and analytics for one platform.
///
/// Implementations are registered with the Capability Registry at startup;
/// the router resolves them per task and performs exactly one invocation
/// per dispatch.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter integrates.
    fn platform(&self) -> Platform;

    /// Operations this adapter supports.
    fn capabilities(&self) -> HashSet<Operation>;

    /// Declared token-bucket profile for this platform's API. `None` defers
    /// to the registry's configured default, then to the platform's built-in
    /// quota.
    fn rate_limit_profile(&self) -> Option<RateLimitProfile> {
        None
    }

    /// Publish a platform-bound artifact on behalf of a client.
    async fn publish(
        &self,
        client: &ClientAccount,
        artifact: &ContentArtifact,
    ) -> Result<PublishResult, AdapterError>;

    /// Collect analytics for a previously published post.
    async fn fetch_analytics(
        &self,
        client: &ClientAccount,
        publish: &PublishResult,
    ) -> Result<AnalyticsSnapshot, AdapterError>;
}

/// External content generation service.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate the campaign's base artifact from the brief, aware of the
    /// tightest constraints among the target platforms.
    async fn generate(
        &self,
        brief: &CampaignBrief,
        platform_constraints: &[PlatformConstraints],
    ) -> Result<ContentArtifact, GenerationError>;
}

/// Result of a CRM sync call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub accepted: bool,
    /// CRM-side reference for the synced event, if any.
    pub crm_reference: Option<String>,
}

/// CRM integration receiving the campaign outcome.
#[async_trait]
pub trait CrmAdapter: Send + Sync {
    /// Sync the campaign report into the CRM pipeline. Implementations must
    /// treat `idempotency_token` as the dedup key: the same token must never
    /// produce two CRM events.
    async fn sync(
        &self,
        report: &CampaignReport,
        idempotency_token: Uuid,
    ) -> Result<SyncResult, AdapterError>;
}

/// Verdict from the compliance hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "data", rename_all = "snake_case")]
pub enum ComplianceDecision {
    Allow,
    Reject { reason: String },
}

impl ComplianceDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Hook gating publishing. Invoked by the format-for-platform task; a
/// rejection fails the corresponding publish task without ever calling the
/// platform adapter.
#[async_trait]
pub trait ComplianceCheck: Send + Sync {
    async fn check(&self, artifact: &ContentArtifact, platform: Platform) -> ComplianceDecision;
}

/// Permissive compliance hook for wiring and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllCompliance;

#[async_trait]
impl ComplianceCheck for AllowAllCompliance {
    async fn check(&self, _artifact: &ContentArtifact, _platform: Platform) -> ComplianceDecision {
        ComplianceDecision::Allow
    }
}
