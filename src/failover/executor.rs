//! Retry/failover state machine around caller operations.
//!
//! # States
//! ```text
//! SELECT ──none──▶ EXHAUSTED
//!   │
//!   ▼
//! ADMIT ──refused──▶ exclude, SELECT
//!   │
//!   ▼
//! RUN (bounded by endpoint timeout)
//!   ├─ ok          ▶ SUCCESS (reset failures, make sticky)
//!   ├─ rate limit  ▶ cooldown, exclude, failover, SELECT
//!   ├─ transient   ▶ failure++, exclude, failover, SELECT
//!   └─ fatal       ▶ propagate
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::FailoverConfig;
use crate::endpoint::{Endpoint, EndpointRegistry};
use crate::failover::backoff::calculate_backoff;
use crate::failover::error::{AttemptFailure, AttemptRecord, ErrorClass, FailoverError, OperationError};
use crate::health::state::HealthTransition;
use crate::observability::metrics;
use crate::selection::SelectionPolicy;
use crate::status::ManagerStats;

/// Runs operations against the best endpoint, failing over on error.
#[derive(Debug, Clone)]
pub struct FailoverExecutor {
    registry: Arc<EndpointRegistry>,
    policy: Arc<SelectionPolicy>,
    stats: Arc<ManagerStats>,
    retry_base_delay_ms: u64,
    retry_max_delay_ms: u64,
}

impl FailoverExecutor {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        policy: Arc<SelectionPolicy>,
        stats: Arc<ManagerStats>,
        config: &FailoverConfig,
    ) -> Self {
        Self {
            registry,
            policy,
            stats,
            retry_base_delay_ms: config.retry_base_delay_ms,
            retry_max_delay_ms: config.retry_max_delay_ms,
        }
    }

    /// Run `operation` with automatic failover.
    ///
    /// The closure is invoked at most once per endpoint; each invocation
    /// receives the endpoint chosen for that attempt. Dropping the returned
    /// future abandons the in-flight attempt.
    pub async fn execute<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, FailoverError>
    where
        F: FnMut(Arc<Endpoint>) -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let call_id = Uuid::new_v4();
        let span = tracing::info_span!("rpc_call", operation = %operation, call_id = %call_id);

        let started = Instant::now();
        let result = self.run(operation, op).instrument(span).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(FailoverError::NoAvailableEndpoint { .. }) => "exhausted",
            Err(FailoverError::Operation { .. }) => "fatal",
        };
        metrics::record_call(operation, outcome, started.elapsed());
        result
    }

    async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, FailoverError>
    where
        F: FnMut(Arc<Endpoint>) -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let mut tried: Vec<String> = Vec::new();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut failed_from: Option<String> = None;
        let mut failovers_in_call: u32 = 0;
        let mut backoff = Duration::ZERO;

        loop {
            let Some(selection) = self.policy.select_with_displacement(&self.registry, &tried) else {
                tracing::error!(
                    attempts = attempts.len(),
                    "No available RPC endpoint, giving up"
                );
                return Err(FailoverError::NoAvailableEndpoint {
                    operation: operation.to_string(),
                    attempts,
                });
            };
            let endpoint = selection.endpoint;

            // A displaced sticky endpoint already failed in this call was counted then.
            if let Some(previous) = selection.displaced.filter(|name| !tried.contains(name)) {
                let count = self.stats.record_failover();
                tracing::warn!(
                    from = %previous,
                    to = %endpoint.name(),
                    failover_count = count,
                    "Current endpoint unavailable, failing over"
                );
                metrics::record_failover(&previous, endpoint.name());
            }
            if let Some(from) = failed_from.take() {
                tracing::info!(from = %from, to = %endpoint.name(), "Failed over to next endpoint");
                metrics::record_failover(&from, endpoint.name());
            }

            // Only wait once there is somewhere left to go.
            if !backoff.is_zero() {
                tokio::time::sleep(std::mem::take(&mut backoff)).await;
            }

            if !endpoint.admit() {
                tracing::debug!(endpoint = %endpoint.name(), "Request window full, skipping endpoint");
                metrics::record_admission_refused(endpoint.name());
                tried.push(endpoint.name().to_string());
                attempts.push(AttemptRecord {
                    endpoint: endpoint.name().to_string(),
                    failure: AttemptFailure::Throttled,
                });
                continue;
            }

            metrics::record_endpoint_selected(endpoint.name());
            tracing::debug!(endpoint = %endpoint.name(), "Executing on endpoint");

            let timeout = endpoint.config().timeout();
            let started = Instant::now();
            let outcome = match tokio::time::timeout(timeout, op(endpoint.clone())).await {
                Ok(result) => result,
                Err(_) => Err(OperationError::Timeout(timeout)),
            };

            let error = match outcome {
                Ok(value) => {
                    self.record_success(&endpoint, started.elapsed());
                    return Ok(value);
                }
                Err(error) => error,
            };

            match error.class() {
                ErrorClass::Fatal => {
                    let count = self.stats.record_fatal_error();
                    tracing::error!(
                        endpoint = %endpoint.name(),
                        error = %error,
                        fatal_error_count = count,
                        "Operation failed with a non-retryable error"
                    );
                    return Err(FailoverError::Operation {
                        endpoint: endpoint.name().to_string(),
                        source: error,
                    });
                }
                ErrorClass::RateLimit => {
                    let cooldown = endpoint.record_rate_limit(error.retry_after());
                    tracing::warn!(
                        endpoint = %endpoint.name(),
                        cooldown_secs = cooldown.as_secs_f64(),
                        error = %error,
                        "Endpoint rate limited, cooling down"
                    );
                    metrics::record_rate_limited(endpoint.name());
                }
                ErrorClass::Transient => {
                    let transition = endpoint.record_failure(error.failure_status());
                    tracing::warn!(
                        endpoint = %endpoint.name(),
                        error = %error,
                        "Operation failed on endpoint"
                    );
                    if transition == HealthTransition::BecameUnhealthy {
                        tracing::warn!(
                            endpoint = %endpoint.name(),
                            threshold = self.registry.failure_threshold(),
                            "Endpoint marked unhealthy"
                        );
                        metrics::record_endpoint_unhealthy(endpoint.name());
                    }
                }
            }

            let count = self.stats.record_failover();
            failovers_in_call += 1;
            tracing::info!(
                from = %endpoint.name(),
                failover_count = count,
                "Failing over"
            );
            tried.push(endpoint.name().to_string());
            failed_from = Some(endpoint.name().to_string());
            attempts.push(AttemptRecord {
                endpoint: endpoint.name().to_string(),
                failure: AttemptFailure::Failed(error),
            });
            backoff = calculate_backoff(
                failovers_in_call,
                self.retry_base_delay_ms,
                self.retry_max_delay_ms,
            );
        }
    }

    fn record_success(&self, endpoint: &Arc<Endpoint>, latency: Duration) {
        if endpoint.record_success(latency) == HealthTransition::Recovered {
            tracing::info!(endpoint = %endpoint.name(), "Endpoint recovered");
            metrics::record_endpoint_recovered(endpoint.name());
        }

        let previous = self.policy.current();
        self.policy.record_success(endpoint);
        if previous.map_or(true, |p| !Arc::ptr_eq(&p, endpoint)) {
            tracing::info!(endpoint = %endpoint.name(), "Selected endpoint");
        }
    }
}
