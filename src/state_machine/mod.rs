//! # State Machine Foundation
//!
//! Campaign and task lifecycle management: state definitions, transition
//! events, and the transition tables that make invalid lifecycle moves
//! unrepresentable. State lives in memory and is mutated only by the
//! campaign coordinator (single writer per campaign).

pub mod campaign;
pub mod events;
pub mod states;
pub mod task;

pub use campaign::{campaign_target_state, AggregationGate};
pub use events::{CampaignEvent, TaskEvent};
pub use states::{CampaignState, TaskStatus};
pub use task::task_target_status;

use thiserror::Error;

/// Errors raised by transition tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },
}

pub type StateMachineResult<T> = std::result::Result<T, StateMachineError>;
