use serde::{Deserialize, Serialize};

/// Events that can trigger campaign state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CampaignEvent {
    /// Begin planning the validated campaign.
    Plan,
    /// Begin (or resume) a dispatch pass.
    Dispatch,
    /// Hold while dispatched tasks are in flight.
    Await,
    /// All tasks terminal; begin aggregation.
    Aggregate,
    /// Every task succeeded.
    Complete,
    /// Mixed outcome: some succeeded, some failed or abandoned.
    CompletePartially,
    /// Campaign failed with the given reason.
    Fail(String),
}

impl CampaignEvent {
    /// Get a string representation of the event type for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Dispatch => "dispatch",
            Self::Await => "await",
            Self::Aggregate => "aggregate",
            Self::Complete => "complete",
            Self::CompletePartially => "complete_partially",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Events that can trigger task status transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// Hand the task to an adapter; exactly one invocation in flight.
    Dispatch,
    /// Adapter invocation succeeded.
    Succeed,
    /// Transient failure; schedule another attempt after backoff.
    ScheduleRetry,
    /// Permanent failure with reason.
    Fail(String),
    /// Give up on the task with reason (retries exhausted, cancellation, or
    /// failed dependency).
    Abandon(String),
}

impl TaskEvent {
    /// Get a string representation of the event type for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::Succeed => "succeed",
            Self::ScheduleRetry => "schedule_retry",
            Self::Fail(_) => "fail",
            Self::Abandon(_) => "abandon",
        }
    }

    /// Extract the reason if this is a failure or abandonment event.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Fail(reason) | Self::Abandon(reason) => Some(reason),
            _ => None,
        }
    }
}
