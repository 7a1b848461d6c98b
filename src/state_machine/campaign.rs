//! # Campaign State Machine
//!
//! Transition table for the campaign lifecycle
//! (`Intake → Planning → Dispatching ↔ AwaitingResults → Aggregating →
//! terminal`) plus the aggregation gate that keeps the
//! `AwaitingResults → Aggregating` transition re-entrant-safe: concurrent
//! completion notifications must trigger a single aggregation pass.

use std::sync::atomic::{AtomicBool, Ordering};

use super::events::CampaignEvent;
use super::states::CampaignState;
use super::{StateMachineError, StateMachineResult};

/// Determine the target state for a campaign event, rejecting invalid moves.
pub fn campaign_target_state(
    current: CampaignState,
    event: &CampaignEvent,
) -> StateMachineResult<CampaignState> {
    use CampaignEvent as E;
    use CampaignState as S;

    let target = match (current, event) {
        (S::Intake, E::Plan) => S::Planning,
        (S::Planning, E::Dispatch) => S::Dispatching,

        // Cooperative scheduling loop: each completed task re-triggers a
        // dispatch pass.
        (S::Dispatching, E::Await) => S::AwaitingResults,
        (S::AwaitingResults, E::Dispatch) => S::Dispatching,

        // Aggregation starts once no task is outstanding; a campaign whose
        // tasks all settle during a dispatch pass aggregates directly.
        (S::Dispatching | S::AwaitingResults, E::Aggregate) => S::Aggregating,

        (S::Aggregating, E::Complete) => S::Completed,
        (S::Aggregating, E::CompletePartially) => S::PartiallyCompleted,

        // Failure is reachable from validation, planning, and aggregation.
        (S::Intake | S::Planning | S::Aggregating, E::Fail(_)) => S::Failed,

        (from, event) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}

/// Campaign-scoped guard ensuring aggregation runs exactly once even when
/// multiple task completions race toward the terminal transition.
#[derive(Debug, Default)]
pub struct AggregationGate {
    fired: AtomicBool,
}

impl AggregationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single aggregation slot. Returns true for exactly one
    /// caller per campaign.
    pub fn begin_aggregation(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }

    pub fn has_aggregated(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = CampaignState::Intake;
        for event in [
            CampaignEvent::Plan,
            CampaignEvent::Dispatch,
            CampaignEvent::Await,
            CampaignEvent::Dispatch,
            CampaignEvent::Aggregate,
            CampaignEvent::Complete,
        ] {
            state = campaign_target_state(state, &event).unwrap();
        }
        assert_eq!(state, CampaignState::Completed);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        assert!(campaign_target_state(CampaignState::Intake, &CampaignEvent::Aggregate).is_err());
        assert!(campaign_target_state(CampaignState::Completed, &CampaignEvent::Dispatch).is_err());
        assert!(
            campaign_target_state(CampaignState::Dispatching, &CampaignEvent::Fail("x".into()))
                .is_err()
        );
    }

    #[test]
    fn test_partial_completion_from_aggregating() {
        let state =
            campaign_target_state(CampaignState::Aggregating, &CampaignEvent::CompletePartially)
                .unwrap();
        assert_eq!(state, CampaignState::PartiallyCompleted);
    }

    #[tokio::test]
    async fn test_aggregation_gate_single_winner() {
        let gate = Arc::new(AggregationGate::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move { gate.begin_aggregation() }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(gate.has_aggregated());
    }
}
