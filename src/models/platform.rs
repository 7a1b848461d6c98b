//! # Platform Definitions
//!
//! The closed set of supported social platforms, the operations an adapter
//! may declare, and the per-platform formatting and rate-limit defaults.
//!
//! Platform behavior is heterogeneous by design: each platform carries its
//! own text length ceiling, hashtag cap, and API rate-limit profile. The
//! orchestrator never special-cases a platform; it only consults these
//! declared profiles and the Capability Registry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::artifact::ContentArtifact;

/// Supported social platforms. A fixed closed set; the Capability Registry
/// performs variant lookup, never dynamic discovery at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
    Tiktok,
    Twitter,
}

impl Platform {
    /// All platform variants, in stable order.
    pub const ALL: [Platform; 4] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Twitter,
    ];

    /// Built-in formatting constraints for this platform.
    pub fn constraints(&self) -> PlatformConstraints {
        match self {
            Platform::Facebook => PlatformConstraints {
                platform: *self,
                max_text_length: 500,
                max_hashtags: 5,
            },
            Platform::Instagram => PlatformConstraints {
                platform: *self,
                max_text_length: 2200,
                max_hashtags: 30,
            },
            Platform::Tiktok => PlatformConstraints {
                platform: *self,
                max_text_length: 2200,
                max_hashtags: 8,
            },
            Platform::Twitter => PlatformConstraints {
                platform: *self,
                max_text_length: 280,
                max_hashtags: 3,
            },
        }
    }

    /// Built-in rate-limit profile, used when neither the adapter nor the
    /// configuration declares one. Values reflect the published API quotas:
    /// Facebook 600/hour, Instagram 200/hour, TikTok 100/hour,
    /// Twitter 300 per 15 minutes.
    pub fn default_rate_limit_profile(&self) -> RateLimitProfile {
        match self {
            Platform::Facebook => RateLimitProfile::per_hour(600, 10),
            Platform::Instagram => RateLimitProfile::per_hour(200, 10),
            Platform::Tiktok => RateLimitProfile::per_hour(100, 5),
            Platform::Twitter => RateLimitProfile::new(300.0 / 900.0, 10),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Facebook => write!(f, "facebook"),
            Self::Instagram => write!(f, "instagram"),
            Self::Tiktok => write!(f, "tiktok"),
            Self::Twitter => write!(f, "twitter"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "facebook" => Ok(Self::Facebook),
            "instagram" => Ok(Self::Instagram),
            "tiktok" => Ok(Self::Tiktok),
            "twitter" => Ok(Self::Twitter),
            _ => Err(format!("Invalid platform: {s}")),
        }
    }
}

/// Operations an adapter may declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Publish,
    Schedule,
    FetchAnalytics,
    SyncLead,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => write!(f, "publish"),
            Self::Schedule => write!(f, "schedule"),
            Self::FetchAnalytics => write!(f, "fetch_analytics"),
            Self::SyncLead => write!(f, "sync_lead"),
        }
    }
}

/// Token-bucket parameters declared per platform: sustained refill rate and
/// burst allowance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitProfile {
    /// Tokens added per second.
    pub refill_per_second: f64,
    /// Maximum bucket size.
    pub burst_size: u32,
}

impl RateLimitProfile {
    pub fn new(refill_per_second: f64, burst_size: u32) -> Self {
        Self {
            refill_per_second,
            burst_size,
        }
    }

    /// Profile from an hourly request quota.
    pub fn per_hour(requests: u32, burst_size: u32) -> Self {
        Self {
            refill_per_second: f64::from(requests) / 3600.0,
            burst_size,
        }
    }
}

/// Formatting constraints applied by the format-for-platform task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConstraints {
    pub platform: Platform,
    /// Maximum post text length in characters; longer text is truncated,
    /// with a trailing ellipsis when the limit leaves room for one.
    pub max_text_length: usize,
    /// Maximum number of hashtags carried on a post.
    pub max_hashtags: usize,
}

impl PlatformConstraints {
    /// Apply these constraints to a generated artifact, producing a new
    /// platform-bound artifact version. The source artifact is never mutated.
    pub fn apply(&self, source: &ContentArtifact) -> ContentArtifact {
        let mut text = source.text.clone();
        let char_count = text.chars().count();
        if char_count > self.max_text_length {
            if self.max_text_length >= 3 {
                let keep = self.max_text_length - 3;
                text = text.chars().take(keep).collect::<String>() + "...";
            } else {
                // No room for an ellipsis; a hard cut still honors the limit.
                text = text.chars().take(self.max_text_length).collect();
            }
        }

        let mut hashtags = source.hashtags.clone();
        hashtags.truncate(self.max_hashtags);

        source.derive_for_platform(self.platform, text, hashtags)
    }
}
