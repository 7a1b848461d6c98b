//! # Task Status Transition Table
//!
//! Valid task lifecycle moves. A task is dispatched at most once at a time,
//! may bounce between `Dispatched` and `Retrying` under transient failure,
//! and can be failed while still `Pending` (compliance rejection converts a
//! publish task without any adapter invocation).

use super::events::TaskEvent;
use super::states::TaskStatus;
use super::{StateMachineError, StateMachineResult};

/// Determine the target status for a task event, rejecting invalid moves.
pub fn task_target_status(
    current: TaskStatus,
    event: &TaskEvent,
) -> StateMachineResult<TaskStatus> {
    use TaskEvent as E;
    use TaskStatus as S;

    let target = match (current, event) {
        (S::Pending | S::Retrying, E::Dispatch) => S::Dispatched,

        (S::Dispatched, E::Succeed) => S::Succeeded,
        (S::Dispatched, E::ScheduleRetry) => S::Retrying,

        // Compliance rejection fails a publish task while it is still
        // pending; dispatched tasks fail on permanent adapter errors.
        (S::Pending | S::Dispatched, E::Fail(_)) => S::Failed,

        // Abandonment covers retry exhaustion, cancellation, and failed
        // dependencies; any non-terminal task can be abandoned.
        (S::Pending | S::Dispatched | S::Retrying, E::Abandon(_)) => S::Abandoned,

        (from, event) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}
