//! # Campaign Report
//!
//! The aggregated outcome of a campaign: every task's final status and
//! failure reason (no silent drops), per-platform publish status, and an
//! aggregate analytics snapshot. The report doubles as the payload for the
//! CRM sync event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::platform::Platform;
use crate::models::task::TaskKind;
use crate::state_machine::states::{CampaignState, TaskStatus};

/// Final record of one task in the campaign report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReportEntry {
    pub task_id: Uuid,
    pub kind: TaskKind,
    pub platform: Option<Platform>,
    pub status: TaskStatus,
    pub attempts: u32,
    pub failure_reason: Option<String>,
}

/// Publish outcome for one target platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPublishStatus {
    pub platform: Platform,
    pub status: TaskStatus,
    pub post_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

/// Summed analytics across every collected snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalyticsTotals {
    pub impressions: u64,
    pub engagements: u64,
    pub clicks: u64,
    /// Number of snapshots contributing to the totals.
    pub snapshots: u32,
}

/// Whether the report reached the CRM, and through which ending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrmSyncOutcome {
    /// No sync has run against this report yet.
    NotAttempted,
    /// The CRM accepted the report.
    Synced { crm_reference: Option<String> },
    /// Every sync path failed; the report never reached the CRM.
    Failed { reason: String },
}

/// Aggregated campaign outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub campaign_id: Uuid,
    pub client_id: Uuid,
    pub crm_pipeline_id: String,
    pub outcome: CampaignState,
    pub tasks: Vec<TaskReportEntry>,
    pub publishes: Vec<PlatformPublishStatus>,
    pub analytics: AnalyticsTotals,
    pub crm_sync: CrmSyncOutcome,
    pub generated_at: DateTime<Utc>,
}

impl CampaignReport {
    pub fn succeeded_task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Succeeded)
            .count()
    }

    pub fn failed_task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Failed | TaskStatus::Abandoned))
            .count()
    }

    /// Look up the publish status for one platform.
    pub fn publish_status(&self, platform: Platform) -> Option<&PlatformPublishStatus> {
        self.publishes.iter().find(|p| p.platform == platform)
    }
}
