//! # Content Artifacts and Platform Results
//!
//! Immutable payloads flowing through a campaign: generated content,
//! per-platform publish results, and analytics snapshots. An artifact is
//! never mutated after creation; reformatting or regeneration produces a new
//! artifact with a bumped version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::platform::Platform;

/// Generated text/media payload. Platform-agnostic when produced by the
/// generate-content task (`platform: None`); platform-bound once the
/// format-for-platform task derives a constrained version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentArtifact {
    pub artifact_id: Uuid,
    pub campaign_id: Uuid,
    pub platform: Option<Platform>,
    pub text: String,
    pub hashtags: Vec<String>,
    pub media_url: Option<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl ContentArtifact {
    /// Create the initial platform-agnostic artifact for a campaign.
    pub fn generated(
        campaign_id: Uuid,
        text: String,
        hashtags: Vec<String>,
        media_url: Option<String>,
    ) -> Self {
        Self {
            artifact_id: Uuid::new_v4(),
            campaign_id,
            platform: None,
            text,
            hashtags,
            media_url,
            version: 1,
            created_at: Utc::now(),
        }
    }

    /// Derive a new platform-bound artifact version. The receiver is left
    /// untouched.
    pub fn derive_for_platform(
        &self,
        platform: Platform,
        text: String,
        hashtags: Vec<String>,
    ) -> Self {
        Self {
            artifact_id: Uuid::new_v4(),
            campaign_id: self.campaign_id,
            platform: Some(platform),
            text,
            hashtags,
            media_url: self.media_url.clone(),
            version: self.version + 1,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one successful publish call. Produced exactly once per
/// successful publish task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub platform: Platform,
    /// Platform-assigned post identifier.
    pub post_id: String,
    pub published_at: DateTime<Utc>,
    /// Raw adapter response summary, kept opaque to the core.
    pub response_summary: serde_json::Value,
}

/// Point-in-time analytics for one published post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub platform: Platform,
    pub post_id: String,
    pub impressions: u64,
    pub engagements: u64,
    pub clicks: u64,
    pub collected_at: DateTime<Utc>,
}
