//! # Task Records
//!
//! The unit of orchestrated work. A task has a kind, an optional target
//! platform, a dependency set, and a status driven through the task
//! transition table. Attempt history and failure reasons are kept on the
//! record so the campaign report never silently drops an outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::platform::Platform;
use crate::state_machine::states::TaskStatus;

/// Task kinds emitted by the planner, in strict layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    GenerateContent,
    FormatForPlatform,
    Publish,
    FetchAnalytics,
    SyncCrm,
}

impl TaskKind {
    /// Whether this kind calls a platform API and therefore consumes a
    /// rate-limit token.
    pub fn consumes_rate_limit(&self) -> bool {
        matches!(self, Self::Publish | Self::FetchAnalytics)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerateContent => write!(f, "generate_content"),
            Self::FormatForPlatform => write!(f, "format_for_platform"),
            Self::Publish => write!(f, "publish"),
            Self::FetchAnalytics => write!(f, "fetch_analytics"),
            Self::SyncCrm => write!(f, "sync_crm"),
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate_content" => Ok(Self::GenerateContent),
            "format_for_platform" => Ok(Self::FormatForPlatform),
            "publish" => Ok(Self::Publish),
            "fetch_analytics" => Ok(Self::FetchAnalytics),
            "sync_crm" => Ok(Self::SyncCrm),
            _ => Err(format!("Invalid task kind: {s}")),
        }
    }
}

/// One orchestrated unit of work within a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub campaign_id: Uuid,
    pub kind: TaskKind,
    /// Target platform; `None` for platform-agnostic kinds
    /// (generate-content, sync-crm).
    pub platform: Option<Platform>,
    /// Tasks that must reach `Succeeded` before this task may start.
    pub depends_on: Vec<Uuid>,
    pub status: TaskStatus,
    /// Completed adapter invocations so far.
    pub attempts: u32,
    pub max_attempts: u32,
    /// Earliest dispatch time; used to delay analytics collection.
    pub not_before: Option<DateTime<Utc>>,
    /// Next attempt time while `Retrying`.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Final failure reason, surfaced verbatim in the campaign report.
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        campaign_id: Uuid,
        kind: TaskKind,
        platform: Option<Platform>,
        depends_on: Vec<Uuid>,
        max_attempts: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            campaign_id,
            kind,
            platform,
            depends_on,
            status: TaskStatus::default(),
            attempts: 0,
            max_attempts,
            not_before: None,
            next_attempt_at: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style earliest-dispatch constraint.
    pub fn with_not_before(mut self, not_before: DateTime<Utc>) -> Self {
        self.not_before = Some(not_before);
        self
    }

    /// Whether the scheduling clock allows dispatch at `now`: the declared
    /// delay has elapsed and any retry backoff has expired.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if let Some(not_before) = self.not_before {
            if now < not_before {
                return false;
            }
        }
        if self.status == TaskStatus::Retrying {
            match self.next_attempt_at {
                Some(at) => now >= at,
                None => true,
            }
        } else {
            true
        }
    }
}
