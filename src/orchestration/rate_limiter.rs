//! # Rate Limiter
//!
//! Token-bucket rate limiting keyed by `(client, platform)`. Each bucket
//! starts full at its burst size and refills continuously at the profile's
//! sustained rate; fractional refill accrues between checks, so a bucket
//! refilling at 0.5 tokens/second yields a whole token every two seconds.
//!
//! Acquisition is non-blocking: a denied task is backpressure for the
//! router, not a failure, and the scheduler re-offers the task on its next
//! tick. Buckets for distinct clients on the same platform are independent.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Instant;
use tracing::trace;
use uuid::Uuid;

use crate::models::{Platform, RateLimitProfile};

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(burst_size: u32) -> Self {
        Self {
            tokens: burst_size as f64,
            last_refill: Instant::now(),
        }
    }

    fn try_take(&mut self, profile: &RateLimitProfile) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * profile.refill_per_second)
            .min(profile.burst_size as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Concurrent token-bucket limiter over `(client, platform)` pairs.
///
/// Buckets are created lazily on first acquisition; the map is never
/// pruned, which is fine at the scale of clients times platforms.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<(Uuid, Platform), Mutex<TokenBucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one token from the client's bucket for this platform. Returns
    /// `false` without blocking when the bucket is empty.
    pub fn try_acquire(
        &self,
        client_id: Uuid,
        platform: Platform,
        profile: &RateLimitProfile,
    ) -> bool {
        let entry = self
            .buckets
            .entry((client_id, platform))
            .or_insert_with(|| Mutex::new(TokenBucket::full(profile.burst_size)));
        let acquired = entry.lock().try_take(profile);
        trace!(
            client_id = %client_id,
            platform = %platform,
            acquired,
            "Rate limit acquisition"
        );
        acquired
    }
}
