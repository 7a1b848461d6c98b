//! # Data Model Layer
//!
//! Core domain records owned by the orchestration engine: client accounts,
//! campaigns, tasks, content artifacts, and outcome reports. These types are
//! plain serializable data; all mutation flows through the orchestration
//! layer under its single-writer discipline.

pub mod artifact;
pub mod campaign;
pub mod platform;
pub mod report;
pub mod task;

pub use artifact::{AnalyticsSnapshot, ContentArtifact, PublishResult};
pub use campaign::{Campaign, CampaignBrief, CampaignRequest, ClientAccount, ScheduleWindow};
pub use platform::{Operation, Platform, PlatformConstraints, RateLimitProfile};
pub use report::{
    AnalyticsTotals, CampaignReport, CrmSyncOutcome, PlatformPublishStatus, TaskReportEntry,
};
pub use task::{Task, TaskKind};
