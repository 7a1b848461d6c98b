//! # Orchestration Types
//!
//! Shared types flowing between the router, the retry manager, and the
//! campaign coordinator: task failures with their retry classification,
//! task outputs, completion notifications, and dispatch decisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::{AdapterError, ComplianceDecision, SyncResult};
use crate::models::{
    AnalyticsSnapshot, CampaignBrief, CampaignReport, ContentArtifact, Operation, Platform,
    PlatformConstraints, PublishResult,
};
use crate::orchestration::aggregator::SyncToken;

/// Retry classification of a task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// May succeed on retry; backed off exponentially up to the attempt
    /// ceiling.
    Transient,
    /// Will never succeed; fails the task immediately.
    Permanent,
    /// Unclassified; retried under a stricter ceiling.
    Unknown,
}

/// Why a dispatched (or gated) task failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskFailure {
    /// The adapter call itself failed.
    Adapter { class: FailureClass, message: String },
    /// The task exceeded its maximum wait duration.
    Timeout { waited_ms: u64 },
    /// The compliance hook rejected the content for this platform.
    ComplianceViolation { reason: String },
    /// No adapter is registered for the task's platform.
    UnknownPlatform { platform: Platform },
    /// The resolved adapter does not declare the required operation.
    UnsupportedOperation {
        platform: Platform,
        operation: Operation,
    },
    /// A dependency output the task needs was never recorded.
    MissingInput { detail: String },
}

impl TaskFailure {
    /// Retry classification per the error taxonomy: timeouts are transient;
    /// compliance violations and misconfiguration are permanent.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Adapter { class, .. } => *class,
            Self::Timeout { .. } => FailureClass::Transient,
            Self::ComplianceViolation { .. }
            | Self::UnknownPlatform { .. }
            | Self::UnsupportedOperation { .. }
            | Self::MissingInput { .. } => FailureClass::Permanent,
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter { message, .. } => write!(f, "{message}"),
            Self::Timeout { waited_ms } => {
                write!(f, "task timed out after {waited_ms}ms")
            }
            Self::ComplianceViolation { reason } => {
                write!(f, "compliance violation: {reason}")
            }
            Self::UnknownPlatform { platform } => {
                write!(f, "no adapter registered for platform {platform}")
            }
            Self::UnsupportedOperation {
                platform,
                operation,
            } => {
                write!(f, "platform {platform} does not support {operation}")
            }
            Self::MissingInput { detail } => write!(f, "missing dependency output: {detail}"),
        }
    }
}

impl From<AdapterError> for TaskFailure {
    fn from(error: AdapterError) -> Self {
        let class = match &error {
            AdapterError::Transient { .. } => FailureClass::Transient,
            AdapterError::Permanent { .. } => FailureClass::Permanent,
            AdapterError::Unknown { .. } => FailureClass::Unknown,
        };
        Self::Adapter {
            class,
            message: error.to_string(),
        }
    }
}

/// Output of a successfully executed task, keyed by task id so dependent
/// tasks can consume it.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskYield {
    /// Platform-agnostic artifact from the generate-content task.
    Content(ContentArtifact),
    /// Platform-bound artifact plus the compliance verdict gathered by the
    /// format-for-platform task.
    FormattedContent {
        artifact: ContentArtifact,
        compliance: ComplianceDecision,
    },
    /// Publish confirmation from the platform adapter.
    Published(PublishResult),
    /// Collected analytics for one post.
    Analytics(AnalyticsSnapshot),
    /// CRM sync confirmation; `None` when the campaign-scoped token shows
    /// the sync already ran.
    CrmSynced(Option<SyncResult>),
}

/// Final outcome of one adapter invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success(TaskYield),
    Failure(TaskFailure),
}

/// Completion notification delivered to the coordinator over its channel.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub task_id: Uuid,
    pub campaign_id: Uuid,
    /// Attempt number this outcome belongs to; stale attempts are discarded.
    pub attempt: u32,
    pub outcome: TaskOutcome,
}

/// Why a dispatch attempt was deferred. Backpressure, not failure: the task
/// stays pending for the next scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The (client, platform) token bucket had no token.
    RateLimited,
    /// The global in-flight task cap is exhausted.
    AtCapacity,
}

/// Router verdict for one dispatch attempt.
#[derive(Debug)]
pub enum DispatchDecision {
    /// Exactly one adapter invocation is now in flight.
    Dispatched,
    /// Backpressure; retry on the next scheduling tick.
    NotReady(NotReadyReason),
    /// Misconfiguration surfaced without any adapter invocation.
    Rejected(TaskFailure),
}

/// Dependency outputs assembled by the coordinator for one dispatch.
#[derive(Clone)]
pub enum TaskInputs {
    Generate {
        brief: CampaignBrief,
        constraints: Vec<PlatformConstraints>,
    },
    Format {
        artifact: ContentArtifact,
    },
    Publish {
        artifact: ContentArtifact,
    },
    FetchAnalytics {
        publish: PublishResult,
    },
    SyncCrm {
        report: CampaignReport,
        token: Arc<SyncToken>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert_eq!(
            TaskFailure::Timeout { waited_ms: 30_000 }.class(),
            FailureClass::Transient
        );
        assert_eq!(
            TaskFailure::ComplianceViolation {
                reason: "banned term".to_string()
            }
            .class(),
            FailureClass::Permanent
        );
        assert_eq!(
            TaskFailure::UnknownPlatform {
                platform: Platform::Tiktok
            }
            .class(),
            FailureClass::Permanent
        );
    }

    #[test]
    fn test_adapter_error_conversion_keeps_class() {
        let failure = TaskFailure::from(AdapterError::transient("503 from platform"));
        assert_eq!(failure.class(), FailureClass::Transient);

        let failure = TaskFailure::from(AdapterError::permanent("invalid credentials"));
        assert_eq!(failure.class(), FailureClass::Permanent);

        let failure = TaskFailure::from(AdapterError::unknown("socket closed"));
        assert_eq!(failure.class(), FailureClass::Unknown);
    }

    #[test]
    fn test_failure_display_carries_reason() {
        let failure = TaskFailure::ComplianceViolation {
            reason: "restricted category".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "compliance violation: restricted category"
        );
    }
}
