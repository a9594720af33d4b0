//! Read-only status reporting.
//!
//! # Responsibilities
//! - Snapshot every endpoint under its own lock
//! - Report the current (sticky) endpoint and manager-wide counters
//! - Serialize for the admin API and periodic log lines

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::endpoint::EndpointRegistry;
use crate::health::state::EndpointStatus;
use crate::selection::SelectionPolicy;

/// Manager-wide counters shared by the executor and the reporter.
#[derive(Debug, Default)]
pub struct ManagerStats {
    failovers: AtomicU64,
    fatal_errors: AtomicU64,
}

impl ManagerStats {
    /// Increment the failover counter and return the new value.
    pub fn record_failover(&self) -> u64 {
        self.failovers.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_fatal_error(&self) -> u64 {
        self.fatal_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn failovers(&self) -> u64 {
        self.failovers.load(Ordering::Relaxed)
    }

    pub fn fatal_errors(&self) -> u64 {
        self.fatal_errors.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSnapshot {
    pub name: String,
    pub priority: i64,
    pub status: EndpointStatus,
    pub available: bool,
    pub consecutive_failures: u32,
    pub error_count: u64,
    pub rate_limited: bool,
    pub rate_limit_remaining_secs: Option<f64>,
    pub last_latency_ms: Option<f64>,
    pub secs_since_last_success: Option<f64>,
    pub recent_requests: usize,
    pub max_rps: u32,
}

/// Manager-wide status summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub current_endpoint: Option<String>,
    pub total_endpoints: usize,
    pub available_endpoints: usize,
    pub failover_count: u64,
    pub fatal_error_count: u64,
    pub endpoints: Vec<EndpointSnapshot>,
}

/// Builds summaries from the shared manager state. Never mutates it.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    registry: Arc<EndpointRegistry>,
    policy: Arc<SelectionPolicy>,
    stats: Arc<ManagerStats>,
}

impl StatusReporter {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        policy: Arc<SelectionPolicy>,
        stats: Arc<ManagerStats>,
    ) -> Self {
        Self {
            registry,
            policy,
            stats,
        }
    }

    pub fn summary(&self) -> StatusSummary {
        let endpoints: Vec<EndpointSnapshot> =
            self.registry.all().iter().map(|e| e.snapshot()).collect();
        // Derived from the same snapshots so the count always matches the list.
        let available_endpoints = endpoints.iter().filter(|s| s.available).count();

        StatusSummary {
            current_endpoint: self.policy.current().map(|e| e.name().to_string()),
            total_endpoints: endpoints.len(),
            available_endpoints,
            failover_count: self.stats.failovers(),
            fatal_error_count: self.stats.fatal_errors(),
            endpoints,
        }
    }
}
