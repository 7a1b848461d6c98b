//! # Result Aggregator
//!
//! Builds the campaign report from the final task graph and the outputs the
//! coordinator collected, then syncs it into the CRM exactly once per
//! campaign.
//!
//! ## Exactly-once CRM sync
//!
//! Two paths can trigger the sync: the planned sync-crm task (when its
//! analytics dependencies all succeeded) and the coordinator's aggregation
//! pass (the fallback when the task was abandoned). Both go through the
//! campaign-scoped [`SyncToken`]: the first caller to win the token's lock
//! performs the sync and marks it fired on success, so a later caller sees
//! the fired flag and returns without touching the CRM. A failed sync leaves
//! the flag clear so the other path may still deliver.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{AdapterError, CrmAdapter, SyncResult};
use crate::models::{
    AnalyticsTotals, Campaign, CampaignReport, CrmSyncOutcome, PlatformPublishStatus, TaskKind,
    TaskReportEntry,
};
use crate::orchestration::task_graph::TaskGraph;
use crate::orchestration::types::TaskYield;
use crate::state_machine::states::{CampaignState, TaskStatus};

/// Campaign-scoped idempotency token guarding the CRM sync.
///
/// The token value doubles as the dedup key handed to the CRM adapter; the
/// fired flag records whether a sync already succeeded under it.
#[derive(Debug)]
pub struct SyncToken {
    token: Uuid,
    fired: Mutex<bool>,
}

impl SyncToken {
    pub fn new() -> Self {
        Self {
            token: Uuid::new_v4(),
            fired: Mutex::new(false),
        }
    }

    /// The dedup key passed to the CRM adapter.
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub async fn has_fired(&self) -> bool {
        *self.fired.lock().await
    }
}

impl Default for SyncToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds campaign reports and performs the guarded CRM sync.
pub struct ResultAggregator {
    crm: Arc<dyn CrmAdapter>,
}

impl ResultAggregator {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }

    /// Assemble the campaign report: every task's final record in plan
    /// order, per-platform publish status, and summed analytics.
    pub fn build_report(
        &self,
        campaign: &Campaign,
        graph: &TaskGraph,
        yields: &HashMap<Uuid, TaskYield>,
    ) -> CampaignReport {
        let mut tasks = Vec::with_capacity(graph.len());
        let mut publishes = Vec::new();
        let mut analytics = AnalyticsTotals::default();

        for task in graph.tasks() {
            tasks.push(TaskReportEntry {
                task_id: task.task_id,
                kind: task.kind,
                platform: task.platform,
                status: task.status,
                attempts: task.attempts,
                failure_reason: task.failure_reason.clone(),
            });

            match task.kind {
                TaskKind::Publish => {
                    let publish = match yields.get(&task.task_id) {
                        Some(TaskYield::Published(result)) => Some(result),
                        _ => None,
                    };
                    if let Some(platform) = task.platform {
                        publishes.push(PlatformPublishStatus {
                            platform,
                            status: task.status,
                            post_id: publish.map(|p| p.post_id.clone()),
                            published_at: publish.map(|p| p.published_at),
                            failure_reason: task.failure_reason.clone(),
                        });
                    }
                }
                TaskKind::FetchAnalytics => {
                    if let Some(TaskYield::Analytics(snapshot)) = yields.get(&task.task_id) {
                        analytics.impressions += snapshot.impressions;
                        analytics.engagements += snapshot.engagements;
                        analytics.clicks += snapshot.clicks;
                        analytics.snapshots += 1;
                    }
                }
                _ => {}
            }
        }

        let outcome = if campaign.state.is_terminal() {
            campaign.state
        } else {
            project_outcome(graph)
        };

        debug!(
            campaign_id = %campaign.campaign_id,
            outcome = %outcome,
            publishes = publishes.len(),
            analytics_snapshots = analytics.snapshots,
            "Built campaign report"
        );

        CampaignReport {
            campaign_id: campaign.campaign_id,
            client_id: campaign.client.client_id,
            crm_pipeline_id: campaign.client.crm_pipeline_id.clone(),
            outcome,
            tasks,
            publishes,
            analytics,
            // Filled in by whichever sync path delivers the report.
            crm_sync: CrmSyncOutcome::NotAttempted,
            generated_at: Utc::now(),
        }
    }

    /// Sync the report into the CRM under the campaign's token. Returns
    /// `Ok(None)` when a previous sync already fired; the CRM receives at
    /// most one event per token.
    pub async fn sync_campaign(
        &self,
        report: &CampaignReport,
        token: &SyncToken,
    ) -> Result<Option<SyncResult>, AdapterError> {
        let mut fired = token.fired.lock().await;
        if *fired {
            debug!(
                campaign_id = %report.campaign_id,
                "CRM sync already delivered for this campaign, skipping"
            );
            return Ok(None);
        }

        match self.crm.sync(report, token.token()).await {
            Ok(result) => {
                *fired = true;
                info!(
                    campaign_id = %report.campaign_id,
                    accepted = result.accepted,
                    crm_reference = ?result.crm_reference,
                    "Synced campaign report to CRM"
                );
                Ok(Some(result))
            }
            Err(error) => {
                warn!(
                    campaign_id = %report.campaign_id,
                    error = %error,
                    "CRM sync failed, token left open for the fallback path"
                );
                Err(error)
            }
        }
    }
}

/// Project a campaign outcome from the task graph when the campaign has not
/// reached a terminal state itself. The sync-crm task is excluded: whether
/// the report reached the CRM does not change what happened on the
/// platforms.
fn project_outcome(graph: &TaskGraph) -> CampaignState {
    let mut succeeded = 0usize;
    let mut total = 0usize;
    for task in graph.tasks() {
        if task.kind == TaskKind::SyncCrm {
            continue;
        }
        total += 1;
        if task.status == TaskStatus::Succeeded {
            succeeded += 1;
        }
    }

    if total > 0 && succeeded == total {
        CampaignState::Completed
    } else if succeeded > 0 {
        CampaignState::PartiallyCompleted
    } else {
        CampaignState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnalyticsSnapshot, CampaignBrief, CampaignRequest, ClientAccount, Platform, PublishResult,
        ScheduleWindow, Task,
    };
    use crate::state_machine::events::TaskEvent;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingCrm {
        calls: AtomicU32,
        fail_first: AtomicU32,
    }

    impl CountingCrm {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_first: AtomicU32::new(0),
            })
        }

        fn failing_once() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_first: AtomicU32::new(1),
            })
        }
    }

    #[async_trait]
    impl CrmAdapter for CountingCrm {
        async fn sync(
            &self,
            _report: &CampaignReport,
            idempotency_token: Uuid,
        ) -> Result<SyncResult, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first.swap(0, Ordering::SeqCst) == 1 {
                return Err(AdapterError::transient("crm unavailable"));
            }
            Ok(SyncResult {
                accepted: true,
                crm_reference: Some(idempotency_token.to_string()),
            })
        }
    }

    fn campaign() -> Campaign {
        let client = ClientAccount::new(
            "Acme",
            [Platform::Facebook, Platform::Twitter],
            "pipeline-1",
        );
        Campaign::intake(CampaignRequest {
            client,
            brief: CampaignBrief {
                objective: "launch".to_string(),
                body: "Launching the new roaster".to_string(),
                hashtags: vec!["coffee".to_string()],
                media_hint: None,
            },
            target_platforms: [Platform::Facebook, Platform::Twitter].into_iter().collect(),
            schedule_window: ScheduleWindow::starting_now(3_600),
        })
        .unwrap()
    }

    fn publish_yield(platform: Platform, post_id: &str) -> TaskYield {
        TaskYield::Published(PublishResult {
            platform,
            post_id: post_id.to_string(),
            published_at: Utc::now(),
            response_summary: serde_json::json!({}),
        })
    }

    fn analytics_yield(platform: Platform, impressions: u64) -> TaskYield {
        TaskYield::Analytics(AnalyticsSnapshot {
            platform,
            post_id: "post".to_string(),
            impressions,
            engagements: impressions / 10,
            clicks: impressions / 100,
            collected_at: Utc::now(),
        })
    }

    fn succeed(graph: &mut TaskGraph, id: &Uuid) {
        graph.apply_event(id, TaskEvent::Dispatch).unwrap();
        graph.apply_event(id, TaskEvent::Succeed).unwrap();
    }

    #[tokio::test]
    async fn test_report_sums_analytics_and_tracks_publishes() {
        let campaign = campaign();
        let mut graph = TaskGraph::new();
        let mut yields = HashMap::new();

        let publish_fb = Task::new(
            campaign.campaign_id,
            TaskKind::Publish,
            Some(Platform::Facebook),
            vec![],
            3,
        );
        let publish_tw = Task::new(
            campaign.campaign_id,
            TaskKind::Publish,
            Some(Platform::Twitter),
            vec![],
            3,
        );
        let analytics_fb = Task::new(
            campaign.campaign_id,
            TaskKind::FetchAnalytics,
            Some(Platform::Facebook),
            vec![publish_fb.task_id],
            3,
        );

        yields.insert(publish_fb.task_id, publish_yield(Platform::Facebook, "fb-1"));
        yields.insert(analytics_fb.task_id, analytics_yield(Platform::Facebook, 1_000));

        let (fb, tw, an) = (publish_fb.task_id, publish_tw.task_id, analytics_fb.task_id);
        graph.insert(publish_fb);
        graph.insert(publish_tw);
        graph.insert(analytics_fb);

        succeed(&mut graph, &fb);
        graph.apply_event(&tw, TaskEvent::Dispatch).unwrap();
        graph
            .apply_event(&tw, TaskEvent::Fail("invalid credentials".to_string()))
            .unwrap();
        succeed(&mut graph, &an);

        let aggregator = ResultAggregator::new(CountingCrm::new());
        let report = aggregator.build_report(&campaign, &graph, &yields);

        assert_eq!(report.outcome, CampaignState::PartiallyCompleted);
        assert_eq!(report.analytics.impressions, 1_000);
        assert_eq!(report.analytics.snapshots, 1);

        let fb_status = report.publish_status(Platform::Facebook).unwrap();
        assert_eq!(fb_status.post_id.as_deref(), Some("fb-1"));
        let tw_status = report.publish_status(Platform::Twitter).unwrap();
        assert_eq!(tw_status.status, TaskStatus::Failed);
        assert_eq!(tw_status.failure_reason.as_deref(), Some("invalid credentials"));
    }

    #[tokio::test]
    async fn test_sync_fires_at_most_once_per_token() {
        let campaign = campaign();
        let crm = CountingCrm::new();
        let aggregator = ResultAggregator::new(Arc::clone(&crm) as Arc<dyn CrmAdapter>);
        let report = aggregator.build_report(&campaign, &TaskGraph::new(), &HashMap::new());
        let token = SyncToken::new();

        let first = aggregator.sync_campaign(&report, &token).await.unwrap();
        assert!(first.is_some());
        let second = aggregator.sync_campaign(&report, &token).await.unwrap();
        assert!(second.is_none());
        assert_eq!(crm.calls.load(Ordering::SeqCst), 1);
        assert!(token.has_fired().await);
    }

    #[tokio::test]
    async fn test_failed_sync_leaves_token_open() {
        let campaign = campaign();
        let crm = CountingCrm::failing_once();
        let aggregator = ResultAggregator::new(Arc::clone(&crm) as Arc<dyn CrmAdapter>);
        let report = aggregator.build_report(&campaign, &TaskGraph::new(), &HashMap::new());
        let token = SyncToken::new();

        assert!(aggregator.sync_campaign(&report, &token).await.is_err());
        assert!(!token.has_fired().await);

        let retried = aggregator.sync_campaign(&report, &token).await.unwrap();
        assert!(retried.is_some());
        assert_eq!(crm.calls.load(Ordering::SeqCst), 2);
    }
}
