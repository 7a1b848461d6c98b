//! # Campaign Planner
//!
//! Expands a validated campaign into its task dependency graph:
//!
//! ```text
//! generate-content
//!   └─ format-for-platform (one per target platform)
//!        └─ publish
//!             └─ fetch-analytics (delayed by the analytics window)
//! sync-crm  (depends on every fetch-analytics task)
//! ```
//!
//! Platforms fan out after generation and never depend on each other, so a
//! failure on one platform cannot stall another. The plan is validated
//! acyclic before it is handed to the coordinator.

use tracing::info;

use crate::config::{BackoffConfig, PlannerConfig};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::models::{Campaign, Task, TaskKind};
use crate::orchestration::task_graph::{delay_from_now, TaskGraph};

/// Builds the task graph for a campaign.
#[derive(Debug, Clone)]
pub struct CampaignPlanner {
    planner: PlannerConfig,
    backoff: BackoffConfig,
}

impl CampaignPlanner {
    pub fn new(planner: PlannerConfig, backoff: BackoffConfig) -> Self {
        Self { planner, backoff }
    }

    /// Expand the campaign into its task graph. Fails when the campaign has
    /// no target platforms, which intake should already have rejected.
    pub fn plan(&self, campaign: &Campaign) -> OrchestrationResult<TaskGraph> {
        if campaign.target_platforms.is_empty() {
            return Err(OrchestrationError::PlanningFailed {
                campaign_id: campaign.campaign_id,
                reason: "campaign has no target platforms".to_string(),
            });
        }

        let max_attempts = self.backoff.max_attempts;
        let mut graph = TaskGraph::new();

        let generate = Task::new(
            campaign.campaign_id,
            TaskKind::GenerateContent,
            None,
            vec![],
            max_attempts,
        );
        let generate_id = generate.task_id;
        graph.insert(generate);

        let mut analytics_ids = Vec::with_capacity(campaign.target_platforms.len());
        for platform in &campaign.target_platforms {
            let format = Task::new(
                campaign.campaign_id,
                TaskKind::FormatForPlatform,
                Some(*platform),
                vec![generate_id],
                max_attempts,
            );
            let format_id = format.task_id;
            graph.insert(format);

            let publish = Task::new(
                campaign.campaign_id,
                TaskKind::Publish,
                Some(*platform),
                vec![format_id],
                max_attempts,
            );
            let publish_id = publish.task_id;
            graph.insert(publish);

            let analytics = Task::new(
                campaign.campaign_id,
                TaskKind::FetchAnalytics,
                Some(*platform),
                vec![publish_id],
                max_attempts,
            )
            .with_not_before(delay_from_now(self.planner.analytics_delay_seconds));
            analytics_ids.push(analytics.task_id);
            graph.insert(analytics);
        }

        let sync = Task::new(
            campaign.campaign_id,
            TaskKind::SyncCrm,
            None,
            analytics_ids,
            max_attempts,
        );
        graph.insert(sync);

        graph.validate_acyclic()?;
        info!(
            campaign_id = %campaign.campaign_id,
            platforms = campaign.target_platforms.len(),
            tasks = graph.len(),
            "Planned campaign task graph"
        );
        Ok(graph)
    }
}
