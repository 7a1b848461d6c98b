//! # SocialSwarm Core
//!
//! Orchestration engine for multi-platform social media campaigns: a client
//! submits one campaign brief, and the engine plans, dispatches, retries,
//! and aggregates the per-platform work needed to generate content, publish
//! it, collect analytics, and sync the outcome into the client's CRM
//! pipeline.
//!
//! ## Architecture
//!
//! - **Models** — campaigns, tasks, content artifacts, and the campaign
//!   report ([`models`])
//! - **State Machines** — explicit transition tables for campaign and task
//!   lifecycles ([`state_machine`])
//! - **Capability Registry** — platform adapters and their declared
//!   operations ([`registry`])
//! - **Orchestration** — planner, coordinator, router, rate limiter, retry
//!   manager, and result aggregator ([`orchestration`])
//! - **Adapters** — trait seams for platforms, content generation, CRM, and
//!   compliance ([`adapters`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swarm_core::adapters::AllowAllCompliance;
//! use swarm_core::config::SwarmConfig;
//! use swarm_core::orchestration::{CampaignCoordinator, CancelToken};
//! use swarm_core::registry::CapabilityRegistry;
//!
//! # async fn example(
//! #     adapter: Arc<dyn swarm_core::adapters::PlatformAdapter>,
//! #     generator: Arc<dyn swarm_core::adapters::ContentGenerator>,
//! #     crm: Arc<dyn swarm_core::adapters::CrmAdapter>,
//! #     request: swarm_core::models::CampaignRequest,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! swarm_core::logging::init_structured_logging();
//!
//! let registry = Arc::new(CapabilityRegistry::new());
//! registry.register(adapter).await;
//!
//! let coordinator = CampaignCoordinator::new(
//!     SwarmConfig::load(None)?,
//!     registry,
//!     generator,
//!     Arc::new(AllowAllCompliance),
//!     crm,
//! );
//!
//! let report = coordinator.run_campaign(request, CancelToken::disabled()).await?;
//! println!("campaign settled: {}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod state_machine;

pub use config::SwarmConfig;
pub use error::{OrchestrationError, OrchestrationResult, Result, SwarmError};
pub use models::{Campaign, CampaignReport, CampaignRequest, Platform};
pub use orchestration::{CampaignCoordinator, CancelHandle, CancelToken};
pub use registry::CapabilityRegistry;
pub use state_machine::states::{CampaignState, TaskStatus};
