//! Error types for the SocialSwarm orchestration core.

use thiserror::Error;
use uuid::Uuid;

use crate::models::Platform;

/// Crate-wide error type surfaced at the public API boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwarmError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Orchestration error: {0}")]
    OrchestrationError(String),
}

pub type Result<T> = std::result::Result<T, SwarmError>;

/// Specific orchestration error types for detailed error handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestrationError {
    /// No adapter registered for the requested platform. Fatal for the
    /// affected task, surfaced in the campaign report.
    #[error("Unknown platform: no adapter registered for {platform}")]
    UnknownPlatform { platform: Platform },

    /// The resolved adapter does not declare the operation the task needs.
    #[error("Platform {platform} does not support operation {operation}")]
    UnsupportedOperation { platform: Platform, operation: String },

    /// Campaign request failed intake validation.
    #[error("Validation failed for {field}: {reason}")]
    ValidationError { field: String, reason: String },

    /// Planner produced an empty or non-layered task graph.
    #[error("Planning failed for campaign {campaign_id}: {reason}")]
    PlanningFailed { campaign_id: Uuid, reason: String },

    /// A state machine rejected a transition.
    #[error("State transition failed for {entity_type} {entity_id}: {reason}")]
    StateTransitionFailed {
        entity_type: String,
        entity_id: Uuid,
        reason: String,
    },

    /// A task referenced a dependency result that was never produced.
    #[error("Missing output of dependency task {dependency_id} for task {task_id}")]
    MissingDependencyOutput { task_id: Uuid, dependency_id: Uuid },

    /// Internal invariant violation.
    #[error("Internal orchestration error: {0}")]
    Internal(String),
}

pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;

impl From<OrchestrationError> for SwarmError {
    fn from(error: OrchestrationError) -> Self {
        match error {
            OrchestrationError::ValidationError { field, reason } => {
                SwarmError::ValidationError(format!("{field}: {reason}"))
            }
            OrchestrationError::StateTransitionFailed { .. } => {
                SwarmError::StateTransitionError(error.to_string())
            }
            other => SwarmError::OrchestrationError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SwarmError {
    fn from(error: serde_json::Error) -> Self {
        SwarmError::ValidationError(format!("JSON serialization error: {error}"))
    }
}
