//! # Orchestration Layer
//!
//! The engine core: the planner expands a campaign into its task graph, the
//! coordinator drives the cooperative scheduling loop, the router gates and
//! dispatches tasks to adapters, the retry manager classifies failures, and
//! the aggregator settles the campaign report into the CRM.
//!
//! ## Component Relationships
//!
//! ```text
//! CampaignCoordinator
//!   ├── CampaignPlanner   → TaskGraph
//!   ├── TaskRouter        → CapabilityRegistry, RateLimiter, adapters
//!   ├── RetryManager      → backoff policy per failure class
//!   └── ResultAggregator  → CampaignReport, CRM sync (SyncToken)
//! ```

pub mod aggregator;
pub mod coordinator;
pub mod planner;
pub mod rate_limiter;
pub mod retry;
pub mod router;
pub mod task_graph;
pub mod types;

pub use aggregator::{ResultAggregator, SyncToken};
pub use coordinator::{CampaignCoordinator, CancelHandle, CancelToken};
pub use planner::CampaignPlanner;
pub use rate_limiter::RateLimiter;
pub use retry::{RetryDecision, RetryManager};
pub use router::TaskRouter;
pub use task_graph::{TaskCounts, TaskGraph};
pub use types::{
    DispatchDecision, FailureClass, NotReadyReason, TaskCompletion, TaskFailure, TaskInputs,
    TaskOutcome, TaskYield,
};
