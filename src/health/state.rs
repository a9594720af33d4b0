//! Endpoint health state machine.
//!
//! # States
//! - Available: below the failure threshold and not rate-limited
//! - Unhealthy: consecutive failures >= threshold (cleared by a success)
//! - Rate-limited: inside a provider-imposed cooldown (cleared once elapsed)
//!
//! # State Transitions
//! ```text
//! Available → Unhealthy:    consecutive_failures reaches threshold
//! Unhealthy → Available:    any success (probe or operation) resets failures
//! Available → RateLimited:  throttling signal sets rate_limited_until
//! RateLimited → Available:  rate_limited_until passes
//! ```
//!
//! # Design Decisions
//! - Rate limiting and failure are orthogonal; a throttle never bumps failures
//! - Transitions are reported to the caller, which owns logging and metrics
//! - Timestamps use tokio's clock so paused-time tests can drive cooldowns

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Longest cooldown any throttling signal can impose.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// Last observed outcome for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStatus {
    Healthy,
    /// Responded, but not with a usable result.
    Degraded,
    Failed,
    RateLimited,
}

/// Health transition caused by a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    Unchanged,
    /// Failure count just reached the threshold.
    BecameUnhealthy,
    /// Failure count was at or above the threshold and was reset.
    Recovered,
}

/// Mutable per-endpoint health data. Always accessed under the endpoint's lock.
#[derive(Debug, Clone)]
pub struct EndpointState {
    pub status: EndpointStatus,
    pub consecutive_failures: u32,
    pub error_count: u64,
    pub rate_limited_until: Option<Instant>,
    pub last_check: Option<Instant>,
    pub last_success: Option<Instant>,
    pub latency: Option<Duration>,
}

impl Default for EndpointState {
    fn default() -> Self {
        Self {
            status: EndpointStatus::Healthy,
            consecutive_failures: 0,
            error_count: 0,
            rate_limited_until: None,
            last_check: None,
            last_success: None,
            latency: None,
        }
    }
}

impl EndpointState {
    /// Whether a throttling cooldown is still in effect at `now`.
    pub fn is_rate_limited(&self, now: Instant) -> bool {
        matches!(self.rate_limited_until, Some(until) if now < until)
    }

    pub fn is_available(&self, now: Instant, failure_threshold: u32) -> bool {
        !self.is_rate_limited(now) && self.consecutive_failures < failure_threshold
    }

    /// Record a successful probe or operation.
    pub fn record_success(
        &mut self,
        now: Instant,
        latency: Duration,
        failure_threshold: u32,
    ) -> HealthTransition {
        let was_unhealthy = self.consecutive_failures >= failure_threshold;

        self.consecutive_failures = 0;
        self.last_check = Some(now);
        self.last_success = Some(now);
        self.latency = Some(latency);
        if self.is_rate_limited(now) {
            self.status = EndpointStatus::RateLimited;
        } else {
            self.status = EndpointStatus::Healthy;
            self.rate_limited_until = None;
        }

        if was_unhealthy {
            HealthTransition::Recovered
        } else {
            HealthTransition::Unchanged
        }
    }

    /// Record a non-throttling failure.
    pub fn record_failure(
        &mut self,
        now: Instant,
        status: EndpointStatus,
        failure_threshold: u32,
    ) -> HealthTransition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.error_count = self.error_count.saturating_add(1);
        self.status = status;
        self.last_check = Some(now);

        if self.consecutive_failures == failure_threshold {
            HealthTransition::BecameUnhealthy
        } else {
            HealthTransition::Unchanged
        }
    }

    /// Start (or extend) a throttling cooldown, capped at [`MAX_COOLDOWN`].
    /// Failure count is untouched.
    pub fn record_rate_limit(&mut self, now: Instant, cooldown: Duration) -> Instant {
        let until = now.checked_add(cooldown.min(MAX_COOLDOWN)).unwrap_or(now);
        self.rate_limited_until = Some(match self.rate_limited_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
        self.status = EndpointStatus::RateLimited;
        self.last_check = Some(now);
        until
    }
}
