//! # Client Accounts and Campaigns
//!
//! A `ClientAccount` is provisioned out-of-band and referenced, never owned,
//! by campaigns. A `Campaign` is created from a validated `CampaignRequest`
//! at intake and mutated only by the orchestrator; terminal states are
//! immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::OrchestrationError;
use crate::models::platform::Platform;
use crate::state_machine::states::CampaignState;

/// Client account with its connected platforms and CRM pipeline reference.
/// Credentials are opaque handles resolved by adapters; the core never
/// stores secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAccount {
    pub client_id: Uuid,
    pub name: String,
    pub connected_platforms: BTreeSet<Platform>,
    /// CRM pipeline the campaign outcome syncs into.
    pub crm_pipeline_id: String,
}

impl ClientAccount {
    pub fn new(
        name: impl Into<String>,
        connected_platforms: impl IntoIterator<Item = Platform>,
        crm_pipeline_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            name: name.into(),
            connected_platforms: connected_platforms.into_iter().collect(),
            crm_pipeline_id: crm_pipeline_id.into(),
        }
    }
}

/// Content brief driving generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignBrief {
    pub objective: String,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub media_hint: Option<String>,
}

/// Scheduling window for the campaign. Publishing is only meaningful while
/// the window is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ScheduleWindow {
    /// Window starting now with the given duration in seconds.
    pub fn starting_now(duration_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            starts_at: now,
            ends_at: now + chrono::Duration::seconds(duration_seconds),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at <= now
    }
}

/// Incoming campaign request, validated at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRequest {
    pub client: ClientAccount,
    pub brief: CampaignBrief,
    pub target_platforms: BTreeSet<Platform>,
    pub schedule_window: ScheduleWindow,
}

/// One coordinated content effort across one or more platforms for one
/// client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub campaign_id: Uuid,
    pub client: ClientAccount,
    pub brief: CampaignBrief,
    pub target_platforms: BTreeSet<Platform>,
    pub schedule_window: ScheduleWindow,
    pub state: CampaignState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Validate a request and admit it as a campaign in `Intake` state.
    ///
    /// Rejected requests never persist past this point: a non-empty platform
    /// set is required, every target platform must be connected for the
    /// client, and the schedule window must not already be expired.
    pub fn intake(request: CampaignRequest) -> Result<Self, OrchestrationError> {
        if request.target_platforms.is_empty() {
            return Err(OrchestrationError::ValidationError {
                field: "target_platforms".to_string(),
                reason: "campaign must target at least one platform".to_string(),
            });
        }

        for platform in &request.target_platforms {
            if !request.client.connected_platforms.contains(platform) {
                return Err(OrchestrationError::ValidationError {
                    field: "target_platforms".to_string(),
                    reason: format!(
                        "platform {platform} is not connected for client {}",
                        request.client.client_id
                    ),
                });
            }
        }

        let now = Utc::now();
        if request.schedule_window.is_expired(now) {
            return Err(OrchestrationError::ValidationError {
                field: "schedule_window".to_string(),
                reason: "schedule window has already expired".to_string(),
            });
        }

        Ok(Self {
            campaign_id: Uuid::new_v4(),
            client: request.client,
            brief: request.brief,
            target_platforms: request.target_platforms,
            schedule_window: request.schedule_window,
            state: CampaignState::Intake,
            created_at: now,
            updated_at: now,
        })
    }
}
