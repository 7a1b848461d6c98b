//! Shared mocks and fixtures for the orchestration integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use swarm_core::adapters::{
    AdapterError, ComplianceCheck, ComplianceDecision, ContentGenerator, CrmAdapter,
    PlatformAdapter, SyncResult,
};
use swarm_core::config::SwarmConfig;
use swarm_core::models::{
    AnalyticsSnapshot, CampaignBrief, CampaignReport, CampaignRequest, ClientAccount,
    ContentArtifact, Operation, Platform, PlatformConstraints, PublishResult, RateLimitProfile,
    ScheduleWindow,
};

/// Ordered record of external calls across all mocks, for asserting the
/// dependency ordering of a campaign run.
#[derive(Debug, Default)]
pub struct CallLog {
    entries: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Index of the first entry matching the prefix.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries
            .lock()
            .iter()
            .position(|e| e.starts_with(prefix))
    }
}

/// Platform adapter driven by a scripted failure sequence: each publish or
/// analytics call pops the next scripted error, succeeding once the script
/// is exhausted.
pub struct MockPlatformAdapter {
    platform: Platform,
    operations: HashSet<Operation>,
    profile: RateLimitProfile,
    publish_script: Mutex<VecDeque<AdapterError>>,
    analytics_script: Mutex<VecDeque<AdapterError>>,
    publish_delay: Option<Duration>,
    pub publish_calls: AtomicU32,
    pub analytics_calls: AtomicU32,
    log: Arc<CallLog>,
}

impl MockPlatformAdapter {
    pub fn new(platform: Platform, log: Arc<CallLog>) -> Self {
        Self {
            platform,
            operations: [Operation::Publish, Operation::FetchAnalytics]
                .into_iter()
                .collect(),
            // Generous bucket so tests exercise ordering, not throughput.
            profile: RateLimitProfile::new(100.0, 100),
            publish_script: Mutex::new(VecDeque::new()),
            analytics_script: Mutex::new(VecDeque::new()),
            publish_delay: None,
            publish_calls: AtomicU32::new(0),
            analytics_calls: AtomicU32::new(0),
            log,
        }
    }

    pub fn with_publish_failures(
        self,
        failures: impl IntoIterator<Item = AdapterError>,
    ) -> Self {
        *self.publish_script.lock() = failures.into_iter().collect();
        self
    }

    pub fn with_analytics_failures(
        self,
        failures: impl IntoIterator<Item = AdapterError>,
    ) -> Self {
        *self.analytics_script.lock() = failures.into_iter().collect();
        self
    }

    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = Some(delay);
        self
    }

    pub fn with_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    pub fn with_rate_limit(mut self, profile: RateLimitProfile) -> Self {
        self.profile = profile;
        self
    }
}

#[async_trait]
impl PlatformAdapter for MockPlatformAdapter {
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
        artifact: &ContentArtifact,
    ) -> Result<PublishResult, AdapterError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("publish:{}", self.platform));

        if let Some(delay) = self.publish_delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.publish_script.lock().pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }

        Ok(PublishResult {
            platform: self.platform,
            post_id: format!("{}-post-{}", self.platform, artifact.version),
            published_at: Utc::now(),
            response_summary: serde_json::json!({ "artifact": artifact.artifact_id }),
        })
    }

    async fn fetch_analytics(
        &self,
        _client: &ClientAccount,
        publish: &PublishResult,
    ) -> Result<AnalyticsSnapshot, AdapterError> {
        self.analytics_calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("analytics:{}", self.platform));

        let scripted = self.analytics_script.lock().pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }

        Ok(AnalyticsSnapshot {
            platform: self.platform,
            post_id: publish.post_id.clone(),
            impressions: 1_000,
            engagements: 100,
            clicks: 10,
            collected_at: Utc::now(),
        })
    }
}

/// Content generator echoing the brief into an artifact.
pub struct MockGenerator {
    pub calls: AtomicU32,
    log: Arc<CallLog>,
}

impl MockGenerator {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            calls: AtomicU32::new(0),
            log,
        }
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(
        &self,
        brief: &CampaignBrief,
        _platform_constraints: &[PlatformConstraints],
    ) -> Result<ContentArtifact, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.record("generate");
        Ok(ContentArtifact::generated(
            Uuid::new_v4(),
            brief.body.clone(),
            brief.hashtags.clone(),
            brief.media_hint.clone(),
        ))
    }
}

/// CRM adapter counting syncs and recording the payload it received. The
/// failing variant rejects every sync, exercising the delivery-failure path.
#[derive(Default)]
pub struct MockCrm {
    pub sync_calls: AtomicU32,
    pub last_report: Mutex<Option<CampaignReport>>,
    pub last_token: Mutex<Option<Uuid>>,
    fail_all: bool,
}

impl MockCrm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_all: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl CrmAdapter for MockCrm {
    async fn sync(
        &self,
        report: &CampaignReport,
        idempotency_token: Uuid,
    ) -> Result<SyncResult, AdapterError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_report.lock() = Some(report.clone());
        *self.last_token.lock() = Some(idempotency_token);
        if self.fail_all {
            return Err(AdapterError::transient("crm endpoint unavailable"));
        }
        Ok(SyncResult {
            accepted: true,
            crm_reference: Some(format!("crm-{idempotency_token}")),
        })
    }
}

/// Compliance hook rejecting content for one platform and allowing the rest.
pub struct RejectingCompliance {
    pub rejected_platform: Platform,
    pub reason: String,
}

#[async_trait]
impl ComplianceCheck for RejectingCompliance {
    async fn check(&self, _artifact: &ContentArtifact, platform: Platform) -> ComplianceDecision {
        if platform == self.rejected_platform {
            ComplianceDecision::Reject {
                reason: self.reason.clone(),
            }
        } else {
            ComplianceDecision::Allow
        }
    }
}

/// Configuration tuned for fast test runs: short backoff, immediate
/// analytics, tight scheduling tick.
pub fn fast_config() -> SwarmConfig {
    let mut config = SwarmConfig::default();
    config.execution.task_timeout_seconds = 2;
    config.execution.scheduling_tick_ms = 10;
    config.backoff.base_delay_ms = 10;
    config.backoff.max_delay_ms = 50;
    config.backoff.max_attempts = 2;
    config.backoff.unknown_max_attempts = 1;
    config.planner.analytics_delay_seconds = 0;
    config
}

/// Campaign request targeting the given platforms, all connected.
pub fn campaign_request(platforms: &[Platform]) -> CampaignRequest {
    CampaignRequest {
        client: ClientAccount::new("Acme Fitness", platforms.iter().copied(), "pipeline-42"),
        brief: CampaignBrief {
            objective: "spring launch".to_string(),
            body: "Our spring collection is live. Come see what's new!".to_string(),
            hashtags: vec!["#spring".to_string(), "#launch".to_string()],
            media_hint: None,
        },
        target_platforms: platforms.iter().copied().collect(),
        schedule_window: ScheduleWindow::starting_now(3_600),
    }
}
