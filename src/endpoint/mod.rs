//! Endpoint registry subsystem.
//!
//! # Data Flow
//! ```text
//! EndpointConfig (validated)
//!     → registry.rs (register, keep priority order)
//!     → Endpoint { config, health state lock, rate_limit.rs window }
//!     → available() / all() snapshots for selection and reporting
//! ```
//!
//! # Design Decisions
//! - Each endpoint owns its locks; unrelated endpoints never contend
//! - Health state and the admission window are separate locks
//! - Config is immutable after registration; state lives for the process

pub mod rate_limit;
pub mod registry;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::EndpointConfig;
use crate::health::state::{EndpointState, EndpointStatus, HealthTransition, MAX_COOLDOWN};
use crate::status::EndpointSnapshot;

pub use rate_limit::RateLimiter;
pub use registry::{EndpointRegistry, RegistryError};

/// A registered RPC endpoint: static config plus synchronized runtime state.
#[derive(Debug)]
pub struct Endpoint {
    config: EndpointConfig,
    failure_threshold: u32,
    state: Mutex<EndpointState>,
    limiter: RateLimiter,
}

impl Endpoint {
    pub(crate) fn new(config: EndpointConfig, failure_threshold: u32) -> Self {
        let limiter = RateLimiter::new(config.max_rps);
        Self {
            config,
            failure_threshold,
            state: Mutex::new(EndpointState::default()),
            limiter,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn http_url(&self) -> &str {
        &self.config.http_url
    }

    pub fn ws_url(&self) -> &str {
        &self.config.ws_url
    }

    pub fn priority(&self) -> i64 {
        self.config.priority
    }

    fn state(&self) -> MutexGuard<'_, EndpointState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current health state.
    pub fn health(&self) -> EndpointState {
        self.state().clone()
    }

    pub fn is_available(&self) -> bool {
        self.is_available_at(Instant::now())
    }

    pub fn is_available_at(&self, now: Instant) -> bool {
        self.state().is_available(now, self.failure_threshold)
    }

    pub(crate) fn last_latency(&self) -> Option<Duration> {
        self.state().latency
    }

    /// Ask the endpoint's rate limiter for one request slot.
    pub fn admit(&self) -> bool {
        self.limiter.admit()
    }

    pub fn record_success(&self, latency: Duration) -> HealthTransition {
        self.state()
            .record_success(Instant::now(), latency, self.failure_threshold)
    }

    pub fn record_failure(&self, status: EndpointStatus) -> HealthTransition {
        self.state()
            .record_failure(Instant::now(), status, self.failure_threshold)
    }

    /// Start a throttling cooldown; `None` uses the configured cooldown.
    /// Returns the cooldown actually applied.
    pub fn record_rate_limit(&self, retry_after: Option<Duration>) -> Duration {
        let cooldown = retry_after
            .unwrap_or_else(|| self.config.cooldown())
            .min(MAX_COOLDOWN);
        self.state().record_rate_limit(Instant::now(), cooldown);
        cooldown
    }

    /// Consistent point-in-time view of this endpoint.
    pub fn snapshot(&self) -> EndpointSnapshot {
        let now = Instant::now();
        let state = self.health();
        let available = state.is_available(now, self.failure_threshold);
        let rate_limited = state.is_rate_limited(now);

        EndpointSnapshot {
            name: self.config.name.clone(),
            priority: self.config.priority,
            status: state.status,
            available,
            consecutive_failures: state.consecutive_failures,
            error_count: state.error_count,
            rate_limited,
            rate_limit_remaining_secs: state
                .rate_limited_until
                .filter(|_| rate_limited)
                .map(|until| until.saturating_duration_since(now).as_secs_f64()),
            last_latency_ms: state.latency.map(|l| l.as_secs_f64() * 1000.0),
            secs_since_last_success: state
                .last_success
                .map(|at| now.saturating_duration_since(at).as_secs_f64()),
            recent_requests: self.limiter.recent_requests(),
            max_rps: self.limiter.max_rps(),
        }
    }
}
