//! # Task Router
//!
//! Routes ready tasks to their executors. For platform-bound work the router
//! resolves the adapter through the capability registry and enforces the
//! gate order: capability check, then the global in-flight cap, then the
//! `(client, platform)` rate limit. Only once every gate passes does it
//! spawn the adapter invocation, so a denied task costs no quota and no
//! adapter call.
//!
//! Dispatched work runs on its own tokio task under the configured timeout;
//! the outcome is delivered back to the coordinator over the campaign's
//! completion channel, tagged with the attempt number it belongs to.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::adapters::{ComplianceCheck, ComplianceDecision, ContentGenerator};
use crate::models::{ClientAccount, Operation, Platform, Task, TaskKind};
use crate::orchestration::aggregator::ResultAggregator;
use crate::orchestration::rate_limiter::RateLimiter;
use crate::orchestration::types::{
    DispatchDecision, NotReadyReason, TaskCompletion, TaskFailure, TaskInputs, TaskOutcome,
    TaskYield,
};
use crate::registry::{CapabilityDescriptor, CapabilityRegistry};

/// Routes tasks through capability, capacity, and rate-limit gates to their
/// executors.
pub struct TaskRouter {
    registry: Arc<CapabilityRegistry>,
    rate_limiter: Arc<RateLimiter>,
    generator: Arc<dyn ContentGenerator>,
    compliance: Arc<dyn ComplianceCheck>,
    aggregator: Arc<ResultAggregator>,
    in_flight: Arc<Semaphore>,
    task_timeout: Duration,
}

impl TaskRouter {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        rate_limiter: Arc<RateLimiter>,
        generator: Arc<dyn ContentGenerator>,
        compliance: Arc<dyn ComplianceCheck>,
        aggregator: Arc<ResultAggregator>,
        max_in_flight: usize,
        task_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            rate_limiter,
            generator,
            compliance,
            aggregator,
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            task_timeout,
        }
    }

    /// Required operation for a platform-bound task kind.
    fn required_operation(kind: TaskKind) -> Option<Operation> {
        match kind {
            TaskKind::Publish => Some(Operation::Publish),
            TaskKind::FetchAnalytics => Some(Operation::FetchAnalytics),
            _ => None,
        }
    }

    /// Attempt to dispatch one task. Exactly one executor invocation goes in
    /// flight on `Dispatched`; `NotReady` is backpressure and `Rejected`
    /// surfaces misconfiguration without consuming quota.
    pub async fn dispatch(
        &self,
        task: &Task,
        client: Arc<ClientAccount>,
        inputs: TaskInputs,
        completions: mpsc::Sender<TaskCompletion>,
    ) -> DispatchDecision {
        // Capability resolution happens before any quota is touched.
        let descriptor = match self.resolve_for(task).await {
            Ok(descriptor) => descriptor,
            Err(failure) => return DispatchDecision::Rejected(failure),
        };

        let permit = match Arc::clone(&self.in_flight).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return DispatchDecision::NotReady(NotReadyReason::AtCapacity),
        };

        if task.kind.consumes_rate_limit() {
            // Platform-bound kinds always carry a platform and a descriptor.
            let (Some(platform), Some(descriptor)) = (task.platform, descriptor.as_ref()) else {
                return DispatchDecision::Rejected(TaskFailure::MissingInput {
                    detail: format!("{} task has no platform binding", task.kind),
                });
            };
            if !self
                .rate_limiter
                .try_acquire(client.client_id, platform, &descriptor.rate_limit)
            {
                drop(permit);
                return DispatchDecision::NotReady(NotReadyReason::RateLimited);
            }
        }

        debug!(
            task_id = %task.task_id,
            campaign_id = %task.campaign_id,
            kind = %task.kind,
            platform = ?task.platform,
            attempt = task.attempts + 1,
            "Dispatching task"
        );

        self.spawn_execution(task, client, descriptor, inputs, completions, permit);
        DispatchDecision::Dispatched
    }

    /// Resolve the adapter descriptor for platform-bound kinds. Local kinds
    /// resolve to `None`.
    async fn resolve_for(
        &self,
        task: &Task,
    ) -> Result<Option<Arc<CapabilityDescriptor>>, TaskFailure> {
        let Some(operation) = Self::required_operation(task.kind) else {
            return Ok(None);
        };
        let Some(platform) = task.platform else {
            return Err(TaskFailure::MissingInput {
                detail: format!("{} task has no platform binding", task.kind),
            });
        };

        let descriptor = self
            .registry
            .resolve(platform)
            .await
            .map_err(|_| TaskFailure::UnknownPlatform { platform })?;

        if !descriptor.operations.contains(&operation) {
            return Err(TaskFailure::UnsupportedOperation {
                platform,
                operation,
            });
        }
        Ok(Some(descriptor))
    }

    fn spawn_execution(
        &self,
        task: &Task,
        client: Arc<ClientAccount>,
        descriptor: Option<Arc<CapabilityDescriptor>>,
        inputs: TaskInputs,
        completions: mpsc::Sender<TaskCompletion>,
        permit: OwnedSemaphorePermit,
    ) {
        let task_id = task.task_id;
        let campaign_id = task.campaign_id;
        let attempt = task.attempts + 1;
        let platform = task.platform;
        let task_timeout = self.task_timeout;

        let generator = Arc::clone(&self.generator);
        let compliance = Arc::clone(&self.compliance);
        let aggregator = Arc::clone(&self.aggregator);

        tokio::spawn(async move {
            let _permit = permit;
            let execution = execute(
                inputs,
                client,
                descriptor,
                platform,
                generator,
                compliance,
                aggregator,
            );

            let outcome = match timeout(task_timeout, execution).await {
                Ok(Ok(output)) => TaskOutcome::Success(output),
                Ok(Err(failure)) => TaskOutcome::Failure(failure),
                Err(_) => TaskOutcome::Failure(TaskFailure::Timeout {
                    waited_ms: task_timeout.as_millis() as u64,
                }),
            };

            let completion = TaskCompletion {
                task_id,
                campaign_id,
                attempt,
                outcome,
            };
            // The coordinator may have stopped consuming (cancellation);
            // dropped completions are intentional.
            if completions.send(completion).await.is_err() {
                warn!(
                    task_id = %task_id,
                    campaign_id = %campaign_id,
                    "Completion channel closed, outcome discarded"
                );
            }
        });
    }
}

/// Execute one task against its external collaborator.
async fn execute(
    inputs: TaskInputs,
    client: Arc<ClientAccount>,
    descriptor: Option<Arc<CapabilityDescriptor>>,
    platform: Option<Platform>,
    generator: Arc<dyn ContentGenerator>,
    compliance: Arc<dyn ComplianceCheck>,
    aggregator: Arc<ResultAggregator>,
) -> Result<TaskYield, TaskFailure> {
    match inputs {
        TaskInputs::Generate { brief, constraints } => {
            let artifact = generator.generate(&brief, &constraints).await?;
            Ok(TaskYield::Content(artifact))
        }
        TaskInputs::Format { artifact } => {
            let platform = platform.ok_or_else(|| TaskFailure::MissingInput {
                detail: "format task has no platform binding".to_string(),
            })?;
            let formatted = platform.constraints().apply(&artifact);
            let decision = compliance.check(&formatted, platform).await;
            if let ComplianceDecision::Reject { reason } = &decision {
                debug!(
                    artifact_id = %formatted.artifact_id,
                    platform = %platform,
                    reason = %reason,
                    "Compliance hook rejected formatted content"
                );
            }
            Ok(TaskYield::FormattedContent {
                artifact: formatted,
                compliance: decision,
            })
        }
        TaskInputs::Publish { artifact } => {
            let descriptor = descriptor.ok_or_else(|| TaskFailure::MissingInput {
                detail: "publish task resolved no adapter".to_string(),
            })?;
            let result = descriptor.adapter.publish(&client, &artifact).await?;
            Ok(TaskYield::Published(result))
        }
        TaskInputs::FetchAnalytics { publish } => {
            let descriptor = descriptor.ok_or_else(|| TaskFailure::MissingInput {
                detail: "analytics task resolved no adapter".to_string(),
            })?;
            let snapshot = descriptor.adapter.fetch_analytics(&client, &publish).await?;
            Ok(TaskYield::Analytics(snapshot))
        }
        TaskInputs::SyncCrm { report, token } => {
            let result = aggregator.sync_campaign(&report, &token).await?;
            Ok(TaskYield::CrmSynced(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        AdapterError, AllowAllCompliance, CrmAdapter, PlatformAdapter, SyncResult,
    };
    use crate::models::{
        AnalyticsSnapshot, CampaignBrief, CampaignReport, ContentArtifact, PublishResult,
        RateLimitProfile,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    struct RecordingAdapter {
        platform: Platform,
        operations: HashSet<Operation>,
        profile: RateLimitProfile,
        publish_calls: AtomicU32,
    }

    #[async_trait]
    impl PlatformAdapter for RecordingAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }

        fn capabilities(&self) -> HashSet<Operation> {
            self.operations.clone()
        }

        fn rate_limit_profile(&self) -> Option<RateLimitProfile> {
            Some(self.profile)
        }

        async fn publish(
            &self,
            _client: &ClientAccount,
            _artifact: &ContentArtifact,
        ) -> Result<PublishResult, AdapterError> {
            self.publish_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PublishResult {
                platform: self.platform,
                post_id: "post-1".to_string(),
                published_at: Utc::now(),
                response_summary: serde_json::json!({}),
            })
        }

        async fn fetch_analytics(
            &self,
            _client: &ClientAccount,
            publish: &PublishResult,
        ) -> Result<AnalyticsSnapshot, AdapterError> {
            Ok(AnalyticsSnapshot {
                platform: self.platform,
                post_id: publish.post_id.clone(),
                impressions: 10,
                engagements: 1,
                clicks: 0,
                collected_at: Utc::now(),
            })
        }
    }

    struct StubGenerator;

    #[async_trait]
    impl ContentGenerator for StubGenerator {
        async fn generate(
            &self,
            brief: &CampaignBrief,
            _constraints: &[crate::models::PlatformConstraints],
        ) -> Result<ContentArtifact, AdapterError> {
            Ok(ContentArtifact::generated(
                Uuid::new_v4(),
                brief.body.clone(),
                brief.hashtags.clone(),
                None,
            ))
        }
    }

    struct NoopCrm;

    #[async_trait]
    impl CrmAdapter for NoopCrm {
        async fn sync(
            &self,
            _report: &CampaignReport,
            _token: Uuid,
        ) -> Result<SyncResult, AdapterError> {
            Ok(SyncResult {
                accepted: true,
                crm_reference: None,
            })
        }
    }

    fn client() -> Arc<ClientAccount> {
        Arc::new(ClientAccount::new(
            "Acme",
            [Platform::Facebook, Platform::Twitter],
            "pipeline-1",
        ))
    }

    async fn router_with(
        adapter: Arc<RecordingAdapter>,
        max_in_flight: usize,
    ) -> TaskRouter {
        let registry = Arc::new(CapabilityRegistry::new());
        registry
            .register(adapter as Arc<dyn PlatformAdapter>)
            .await;
        TaskRouter::new(
            registry,
            Arc::new(RateLimiter::new()),
            Arc::new(StubGenerator),
            Arc::new(AllowAllCompliance),
            Arc::new(ResultAggregator::new(Arc::new(NoopCrm))),
            max_in_flight,
            Duration::from_secs(5),
        )
    }

    fn publish_task(platform: Platform) -> Task {
        Task::new(Uuid::new_v4(), TaskKind::Publish, Some(platform), vec![], 3)
    }

    fn artifact() -> ContentArtifact {
        ContentArtifact::generated(
            Uuid::new_v4(),
            "Launch day".to_string(),
            vec!["#launch".to_string()],
            None,
        )
    }

    #[tokio::test]
    async fn test_unknown_platform_rejected_without_adapter_call() {
        let adapter = Arc::new(RecordingAdapter {
            platform: Platform::Facebook,
            operations: [Operation::Publish].into_iter().collect(),
            profile: RateLimitProfile::new(1.0, 5),
            publish_calls: AtomicU32::new(0),
        });
        let router = router_with(Arc::clone(&adapter), 8).await;
        let (tx, _rx) = mpsc::channel(8);

        let decision = router
            .dispatch(
                &publish_task(Platform::Twitter),
                client(),
                TaskInputs::Publish {
                    artifact: artifact(),
                },
                tx,
            )
            .await;

        assert!(matches!(
            decision,
            DispatchDecision::Rejected(TaskFailure::UnknownPlatform {
                platform: Platform::Twitter
            })
        ));
        assert_eq!(adapter.publish_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_operation_rejected() {
        let adapter = Arc::new(RecordingAdapter {
            platform: Platform::Facebook,
            operations: [Operation::FetchAnalytics].into_iter().collect(),
            profile: RateLimitProfile::new(1.0, 5),
            publish_calls: AtomicU32::new(0),
        });
        let router = router_with(adapter, 8).await;
        let (tx, _rx) = mpsc::channel(8);

        let decision = router
            .dispatch(
                &publish_task(Platform::Facebook),
                client(),
                TaskInputs::Publish {
                    artifact: artifact(),
                },
                tx,
            )
            .await;

        assert!(matches!(
            decision,
            DispatchDecision::Rejected(TaskFailure::UnsupportedOperation {
                operation: Operation::Publish,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_denial_is_backpressure() {
        let adapter = Arc::new(RecordingAdapter {
            platform: Platform::Facebook,
            operations: [Operation::Publish].into_iter().collect(),
            // One-token bucket with a refill too slow to matter here.
            profile: RateLimitProfile::new(0.001, 1),
            publish_calls: AtomicU32::new(0),
        });
        let router = router_with(Arc::clone(&adapter), 8).await;
        let (tx, mut rx) = mpsc::channel(8);
        let client = client();

        let first = router
            .dispatch(
                &publish_task(Platform::Facebook),
                Arc::clone(&client),
                TaskInputs::Publish {
                    artifact: artifact(),
                },
                tx.clone(),
            )
            .await;
        assert!(matches!(first, DispatchDecision::Dispatched));

        let second = router
            .dispatch(
                &publish_task(Platform::Facebook),
                client,
                TaskInputs::Publish {
                    artifact: artifact(),
                },
                tx,
            )
            .await;
        assert!(matches!(
            second,
            DispatchDecision::NotReady(NotReadyReason::RateLimited)
        ));

        // Exactly one adapter invocation went in flight.
        let completion = rx.recv().await.unwrap();
        assert!(matches!(completion.outcome, TaskOutcome::Success(_)));
        assert_eq!(adapter.publish_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capacity_denial_when_semaphore_exhausted() {
        let adapter = Arc::new(RecordingAdapter {
            platform: Platform::Facebook,
            operations: [Operation::Publish].into_iter().collect(),
            profile: RateLimitProfile::new(1.0, 10),
            publish_calls: AtomicU32::new(0),
        });
        let router = router_with(adapter, 0).await;
        let (tx, _rx) = mpsc::channel(8);

        let decision = router
            .dispatch(
                &publish_task(Platform::Facebook),
                client(),
                TaskInputs::Publish {
                    artifact: artifact(),
                },
                tx,
            )
            .await;
        assert!(matches!(
            decision,
            DispatchDecision::NotReady(NotReadyReason::AtCapacity)
        ));
    }

    #[tokio::test]
    async fn test_format_task_reports_compliance_decision() {
        let adapter = Arc::new(RecordingAdapter {
            platform: Platform::Facebook,
            operations: [Operation::Publish].into_iter().collect(),
            profile: RateLimitProfile::new(1.0, 5),
            publish_calls: AtomicU32::new(0),
        });
        let router = router_with(adapter, 8).await;
        let (tx, mut rx) = mpsc::channel(8);

        let task = Task::new(
            Uuid::new_v4(),
            TaskKind::FormatForPlatform,
            Some(Platform::Facebook),
            vec![],
            3,
        );
        let decision = router
            .dispatch(
                &task,
                client(),
                TaskInputs::Format {
                    artifact: artifact(),
                },
                tx,
            )
            .await;
        assert!(matches!(decision, DispatchDecision::Dispatched));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.attempt, 1);
        match completion.outcome {
            TaskOutcome::Success(TaskYield::FormattedContent {
                artifact,
                compliance,
            }) => {
                assert_eq!(artifact.platform, Some(Platform::Facebook));
                assert!(compliance.is_allowed());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
