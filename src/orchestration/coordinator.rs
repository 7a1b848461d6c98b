//! # Campaign Coordinator
//!
//! Drives one campaign from intake to its terminal state: validates the
//! request, plans the task graph, runs the cooperative dispatch loop, applies
//! completion outcomes through the task state machine, and hands the settled
//! graph to the aggregator.
//!
//! ## Scheduling loop
//!
//! The coordinator alternates `Dispatching` and `AwaitingResults`: each pass
//! offers every ready task to the router, then parks on the completion
//! channel until an outcome (or the scheduling tick, for backoff and
//! rate-limit wakeups) arrives. Completions carry the attempt number they
//! belong to; anything stale, including outcomes that land after
//! cancellation, is discarded.

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{ComplianceCheck, ComplianceDecision, ContentGenerator, CrmAdapter};
use crate::config::SwarmConfig;
use crate::error::{Result, SwarmError};
use crate::models::{
    Campaign, CampaignReport, CampaignRequest, ClientAccount, CrmSyncOutcome, TaskKind,
};
use crate::orchestration::aggregator::{ResultAggregator, SyncToken};
use crate::orchestration::planner::CampaignPlanner;
use crate::orchestration::rate_limiter::RateLimiter;
use crate::orchestration::retry::{RetryDecision, RetryManager};
use crate::orchestration::router::TaskRouter;
use crate::orchestration::task_graph::TaskGraph;
use crate::orchestration::types::{
    DispatchDecision, TaskCompletion, TaskFailure, TaskInputs, TaskOutcome, TaskYield,
};
use crate::registry::CapabilityRegistry;
use crate::state_machine::campaign::{campaign_target_state, AggregationGate};
use crate::state_machine::events::{CampaignEvent, TaskEvent};
use crate::state_machine::states::{CampaignState, TaskStatus};

/// Cancels a running campaign. Dropping the handle does not cancel.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cancellation signal observed by the coordinator's scheduling loop.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
    // Keeps the sender alive for tokens that can never fire.
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl CancelToken {
    /// Handle/token pair for a cancellable campaign run.
    pub fn cancellation() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        let tx = Arc::new(tx);
        (
            CancelHandle { tx: Arc::clone(&tx) },
            CancelToken {
                rx,
                _keepalive: Some(tx),
            },
        )
    }

    /// Token that never fires, for callers that do not need cancellation.
    pub fn disabled() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when cancellation fires; pends forever if it never does.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Orchestrates campaigns end to end.
pub struct CampaignCoordinator {
    config: SwarmConfig,
    planner: CampaignPlanner,
    router: Arc<TaskRouter>,
    aggregator: Arc<ResultAggregator>,
    retry: RetryManager,
}

impl CampaignCoordinator {
    pub fn new(
        config: SwarmConfig,
        registry: Arc<CapabilityRegistry>,
        generator: Arc<dyn ContentGenerator>,
        compliance: Arc<dyn ComplianceCheck>,
        crm: Arc<dyn CrmAdapter>,
    ) -> Self {
        let aggregator = Arc::new(ResultAggregator::new(crm));
        let router = Arc::new(TaskRouter::new(
            registry,
            Arc::new(RateLimiter::new()),
            generator,
            compliance,
            Arc::clone(&aggregator),
            config.execution.max_in_flight_tasks,
            config.execution.task_timeout(),
        ));

        Self {
            planner: CampaignPlanner::new(config.planner.clone(), config.backoff.clone()),
            retry: RetryManager::new(config.backoff.clone()),
            router,
            aggregator,
            config,
        }
    }

    /// Run one campaign to a terminal state and return its report.
    ///
    /// Intake validation failures return an error; everything after intake
    /// settles into the report instead, including planning failures and
    /// cancellation.
    pub async fn run_campaign(
        &self,
        request: CampaignRequest,
        mut cancel: CancelToken,
    ) -> Result<CampaignReport> {
        let mut campaign = Campaign::intake(request).map_err(SwarmError::from)?;
        info!(
            campaign_id = %campaign.campaign_id,
            client_id = %campaign.client.client_id,
            platforms = campaign.target_platforms.len(),
            "Campaign admitted"
        );

        self.transition_campaign(&mut campaign, CampaignEvent::Plan)?;
        let mut graph = match self.planner.plan(&campaign) {
            Ok(graph) => graph,
            Err(error) => {
                warn!(
                    campaign_id = %campaign.campaign_id,
                    error = %error,
                    "Planning failed"
                );
                self.transition_campaign(&mut campaign, CampaignEvent::Fail(error.to_string()))?;
                return Ok(self
                    .aggregator
                    .build_report(&campaign, &TaskGraph::new(), &HashMap::new()));
            }
        };

        self.transition_campaign(&mut campaign, CampaignEvent::Dispatch)?;

        let client = Arc::new(campaign.client.clone());
        let sync_token = Arc::new(SyncToken::new());
        let gate = AggregationGate::new();
        let mut yields: HashMap<Uuid, TaskYield> = HashMap::new();

        // Sized so completion sends never block even when every attempt of
        // every task is in flight at once.
        let capacity = (graph.len() * (self.config.backoff.max_attempts as usize + 1)).max(16);
        let (tx, mut rx) = mpsc::channel::<TaskCompletion>(capacity);

        loop {
            if cancel.is_cancelled() {
                info!(campaign_id = %campaign.campaign_id, "Campaign cancelled");
                graph.abandon_outstanding("campaign cancelled").map_err(SwarmError::from)?;
                break;
            }

            if campaign.state == CampaignState::AwaitingResults {
                self.transition_campaign(&mut campaign, CampaignEvent::Dispatch)?;
            }
            self.dispatch_pass(&campaign, &mut graph, &client, &yields, &sync_token, &tx)
                .await?;

            if graph.all_terminal() {
                break;
            }
            self.transition_campaign(&mut campaign, CampaignEvent::Await)?;

            tokio::select! {
                received = rx.recv() => {
                    if let Some(completion) = received {
                        self.apply_completion(&mut graph, completion, &mut yields)?;
                        // Drain whatever else already landed before the next
                        // dispatch pass.
                        while let Ok(more) = rx.try_recv() {
                            self.apply_completion(&mut graph, more, &mut yields)?;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!(campaign_id = %campaign.campaign_id, "Campaign cancelled");
                    graph.abandon_outstanding("campaign cancelled").map_err(SwarmError::from)?;
                    break;
                }
                _ = tokio::time::sleep(self.config.execution.scheduling_tick()) => {}
            }
        }

        // Single aggregation pass per campaign, even when several paths race
        // to the terminal transition.
        if !gate.begin_aggregation() {
            return Err(SwarmError::OrchestrationError(
                "aggregation already performed for this campaign".to_string(),
            ));
        }

        self.transition_campaign(&mut campaign, CampaignEvent::Aggregate)?;
        let outcome_event = resolve_outcome(&graph);
        self.transition_campaign(&mut campaign, outcome_event)?;

        let mut report = self.aggregator.build_report(&campaign, &graph, &yields);
        report.crm_sync = match self.aggregator.sync_campaign(&report, &sync_token).await {
            Ok(Some(result)) => CrmSyncOutcome::Synced {
                crm_reference: result.crm_reference,
            },
            // The sync-crm task already delivered; recover its reference
            // from the recorded yield.
            Ok(None) => CrmSyncOutcome::Synced {
                crm_reference: yields.values().find_map(|y| match y {
                    TaskYield::CrmSynced(Some(result)) => result.crm_reference.clone(),
                    _ => None,
                }),
            },
            Err(error) => {
                warn!(
                    campaign_id = %campaign.campaign_id,
                    error = %error,
                    "CRM sync failed during aggregation"
                );
                CrmSyncOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        };

        info!(
            campaign_id = %campaign.campaign_id,
            outcome = %report.outcome,
            succeeded = report.succeeded_task_count(),
            failed = report.failed_task_count(),
            "Campaign settled"
        );
        Ok(report)
    }

    /// Offer every ready task to the router. Denials leave the task pending
    /// for the next pass; rejections settle it as failed without an adapter
    /// call.
    async fn dispatch_pass(
        &self,
        campaign: &Campaign,
        graph: &mut TaskGraph,
        client: &Arc<ClientAccount>,
        yields: &HashMap<Uuid, TaskYield>,
        sync_token: &Arc<SyncToken>,
        tx: &mpsc::Sender<TaskCompletion>,
    ) -> Result<()> {
        for task_id in graph.ready_task_ids(Utc::now()) {
            let Some(task) = graph.get(&task_id) else {
                continue;
            };

            let inputs = match build_inputs(campaign, graph, task, yields, sync_token, &self.aggregator) {
                Ok(inputs) => inputs,
                Err(failure) => {
                    self.settle_rejection(graph, &task_id, failure)?;
                    continue;
                }
            };

            let task = task.clone();
            match self
                .router
                .dispatch(&task, Arc::clone(client), inputs, tx.clone())
                .await
            {
                DispatchDecision::Dispatched => {
                    graph
                        .apply_event(&task_id, TaskEvent::Dispatch)
                        .map_err(SwarmError::from)?;
                }
                DispatchDecision::NotReady(reason) => {
                    debug!(
                        task_id = %task_id,
                        reason = ?reason,
                        "Task deferred by backpressure"
                    );
                }
                DispatchDecision::Rejected(failure) => {
                    self.settle_rejection(graph, &task_id, failure)?;
                }
            }
        }
        Ok(())
    }

    /// Fail a task that was rejected before any adapter invocation, then
    /// abandon everything downstream of it.
    fn settle_rejection(
        &self,
        graph: &mut TaskGraph,
        task_id: &Uuid,
        failure: TaskFailure,
    ) -> Result<()> {
        warn!(task_id = %task_id, failure = %failure, "Task rejected at dispatch");
        graph
            .apply_event(task_id, TaskEvent::Fail(failure.to_string()))
            .map_err(SwarmError::from)?;
        graph.abandon_dependents_of(task_id).map_err(SwarmError::from)?;
        Ok(())
    }

    /// Apply one completion to the graph. Stale completions, including any
    /// that arrive for tasks abandoned by cancellation, are discarded.
    fn apply_completion(
        &self,
        graph: &mut TaskGraph,
        completion: TaskCompletion,
        yields: &mut HashMap<Uuid, TaskYield>,
    ) -> Result<()> {
        let Some(task) = graph.get(&completion.task_id) else {
            return Ok(());
        };
        if task.status != TaskStatus::Dispatched || task.attempts != completion.attempt {
            debug!(
                task_id = %completion.task_id,
                attempt = completion.attempt,
                status = %task.status,
                "Discarding stale completion"
            );
            return Ok(());
        }
        let attempts = task.attempts;

        match completion.outcome {
            TaskOutcome::Success(output) => {
                graph
                    .apply_event(&completion.task_id, TaskEvent::Succeed)
                    .map_err(SwarmError::from)?;
                let rejection = match &output {
                    TaskYield::FormattedContent {
                        compliance: ComplianceDecision::Reject { reason },
                        ..
                    } => Some(reason.clone()),
                    _ => None,
                };
                yields.insert(completion.task_id, output);

                if let Some(reason) = rejection {
                    self.fail_publish_after_rejection(graph, &completion.task_id, &reason)?;
                }
            }
            TaskOutcome::Failure(failure) => {
                self.settle_failure(graph, &completion.task_id, failure, attempts)?;
            }
        }
        Ok(())
    }

    /// A compliance rejection settles the dependent publish task as failed
    /// before it ever reaches the router, and abandons its downstream tasks.
    fn fail_publish_after_rejection(
        &self,
        graph: &mut TaskGraph,
        format_task_id: &Uuid,
        reason: &str,
    ) -> Result<()> {
        let publish_ids: Vec<Uuid> = graph
            .dependents_of(format_task_id)
            .iter()
            .filter(|id| graph.get(id).map(|t| t.kind) == Some(TaskKind::Publish))
            .copied()
            .collect();

        for publish_id in publish_ids {
            let failure = TaskFailure::ComplianceViolation {
                reason: reason.to_string(),
            };
            warn!(
                task_id = %publish_id,
                reason = %reason,
                "Publish blocked by compliance rejection"
            );
            graph
                .apply_event(&publish_id, TaskEvent::Fail(failure.to_string()))
                .map_err(SwarmError::from)?;
            graph.abandon_dependents_of(&publish_id).map_err(SwarmError::from)?;
        }
        Ok(())
    }

    /// Route a failed attempt through the retry policy.
    fn settle_failure(
        &self,
        graph: &mut TaskGraph,
        task_id: &Uuid,
        failure: TaskFailure,
        attempts: u32,
    ) -> Result<()> {
        match self.retry.assess(&failure, attempts) {
            RetryDecision::Retry { delay } => {
                graph
                    .apply_event(task_id, TaskEvent::ScheduleRetry)
                    .map_err(SwarmError::from)?;
                let next = Utc::now()
                    + ChronoDuration::milliseconds(delay.as_millis().min(i64::MAX as u128) as i64);
                graph.schedule_retry_at(task_id, next).map_err(SwarmError::from)?;
                debug!(
                    task_id = %task_id,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Task retry scheduled"
                );
            }
            RetryDecision::Fail => {
                graph
                    .apply_event(task_id, TaskEvent::Fail(failure.to_string()))
                    .map_err(SwarmError::from)?;
                graph.abandon_dependents_of(task_id).map_err(SwarmError::from)?;
            }
            RetryDecision::Abandon => {
                let reason = format!("retries exhausted after {attempts} attempts: {failure}");
                graph
                    .apply_event(task_id, TaskEvent::Abandon(reason))
                    .map_err(SwarmError::from)?;
                graph.abandon_dependents_of(task_id).map_err(SwarmError::from)?;
            }
        }
        Ok(())
    }

    fn transition_campaign(
        &self,
        campaign: &mut Campaign,
        event: CampaignEvent,
    ) -> Result<()> {
        let target = campaign_target_state(campaign.state, &event)
            .map_err(|e| SwarmError::StateTransitionError(e.to_string()))?;
        debug!(
            campaign_id = %campaign.campaign_id,
            from = %campaign.state,
            to = %target,
            event = event.event_type(),
            "Campaign transition"
        );
        campaign.state = target;
        campaign.updated_at = Utc::now();
        Ok(())
    }
}

/// Terminal event for a settled graph: every task succeeded completes the
/// campaign; any success at all completes it partially; none fails it.
fn resolve_outcome(graph: &TaskGraph) -> CampaignEvent {
    let counts = graph.counts();
    if counts.outstanding > 0 {
        // Unreachable from the scheduling loop; fail loudly if it happens.
        return CampaignEvent::Fail("aggregation reached with outstanding tasks".to_string());
    }
    if counts.failed == 0 && counts.abandoned == 0 {
        CampaignEvent::Complete
    } else if counts.succeeded > 0 {
        CampaignEvent::CompletePartially
    } else {
        CampaignEvent::Fail("no task succeeded".to_string())
    }
}

/// Assemble the dependency outputs a task consumes.
fn build_inputs(
    campaign: &Campaign,
    graph: &TaskGraph,
    task: &crate::models::Task,
    yields: &HashMap<Uuid, TaskYield>,
    sync_token: &Arc<SyncToken>,
    aggregator: &ResultAggregator,
) -> std::result::Result<TaskInputs, TaskFailure> {
    let dependency_yield = |kind: TaskKind| -> std::result::Result<&TaskYield, TaskFailure> {
        let dep_id = graph
            .dependency_of_kind(&task.task_id, kind)
            .ok_or_else(|| TaskFailure::MissingInput {
                detail: format!("{} task has no {kind} dependency", task.kind),
            })?;
        yields.get(&dep_id).ok_or_else(|| TaskFailure::MissingInput {
            detail: format!("no recorded output for dependency task {dep_id}"),
        })
    };

    match task.kind {
        TaskKind::GenerateContent => Ok(TaskInputs::Generate {
            brief: campaign.brief.clone(),
            constraints: campaign
                .target_platforms
                .iter()
                .map(|p| p.constraints())
                .collect(),
        }),
        TaskKind::FormatForPlatform => match dependency_yield(TaskKind::GenerateContent)? {
            TaskYield::Content(artifact) => Ok(TaskInputs::Format {
                artifact: artifact.clone(),
            }),
            _ => Err(TaskFailure::MissingInput {
                detail: "generate dependency produced no artifact".to_string(),
            }),
        },
        TaskKind::Publish => match dependency_yield(TaskKind::FormatForPlatform)? {
            TaskYield::FormattedContent { artifact, .. } => Ok(TaskInputs::Publish {
                artifact: artifact.clone(),
            }),
            _ => Err(TaskFailure::MissingInput {
                detail: "format dependency produced no artifact".to_string(),
            }),
        },
        TaskKind::FetchAnalytics => match dependency_yield(TaskKind::Publish)? {
            TaskYield::Published(publish) => Ok(TaskInputs::FetchAnalytics {
                publish: publish.clone(),
            }),
            _ => Err(TaskFailure::MissingInput {
                detail: "publish dependency produced no result".to_string(),
            }),
        },
        TaskKind::SyncCrm => Ok(TaskInputs::SyncCrm {
            report: aggregator.build_report(campaign, graph, yields),
            token: Arc::clone(sync_token),
        }),
    }
}
