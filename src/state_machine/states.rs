use serde::{Deserialize, Serialize};
use std::fmt;

/// Campaign lifecycle states driven by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    /// Request admitted, awaiting validation outcome.
    Intake,
    /// Planner is expanding the campaign into a task graph.
    Planning,
    /// Scheduler is dispatching ready tasks.
    Dispatching,
    /// Dispatched tasks are in flight.
    AwaitingResults,
    /// All tasks terminal; building the campaign report.
    Aggregating,
    /// Every task succeeded.
    Completed,
    /// All tasks terminal, at least one failed or abandoned, at least one
    /// succeeded.
    PartiallyCompleted,
    /// No task ever succeeded, or validation/planning failed.
    Failed,
}

impl CampaignState {
    /// Check if this is a terminal state (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyCompleted | Self::Failed
        )
    }

    /// Check if the campaign is actively scheduling or waiting on work.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Dispatching | Self::AwaitingResults)
    }
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Planning => write!(f, "planning"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::AwaitingResults => write!(f, "awaiting_results"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Completed => write!(f, "completed"),
            Self::PartiallyCompleted => write!(f, "partially_completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CampaignState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intake" => Ok(Self::Intake),
            "planning" => Ok(Self::Planning),
            "dispatching" => Ok(Self::Dispatching),
            "awaiting_results" => Ok(Self::AwaitingResults),
            "aggregating" => Ok(Self::Aggregating),
            "completed" => Ok(Self::Completed),
            "partially_completed" => Ok(Self::PartiallyCompleted),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid campaign state: {s}")),
        }
    }
}

impl Default for CampaignState {
    fn default() -> Self {
        Self::Intake
    }
}

/// Task status definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting on dependencies or a rate-limit slot.
    Pending,
    /// Exactly one adapter invocation is in flight.
    Dispatched,
    /// Failed transiently; waiting out the backoff delay.
    Retrying,
    /// Terminal success.
    Succeeded,
    /// Terminal permanent failure.
    Failed,
    /// Terminal: retries exhausted, cancelled, or dependency failed.
    Abandoned,
}

impl TaskStatus {
    /// Check if this is a terminal status (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Abandoned)
    }

    /// Check if an adapter invocation is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Dispatched)
    }

    /// Check if this status satisfies dependencies for dependent tasks.
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Check if the task still holds up campaign completion.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Pending | Self::Dispatched | Self::Retrying)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Dispatched => write!(f, "dispatched"),
            Self::Retrying => write!(f, "retrying"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "dispatched" => Ok(Self::Dispatched),
            "retrying" => Ok(Self::Retrying),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}
