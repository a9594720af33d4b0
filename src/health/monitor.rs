//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered endpoint
//! - Update endpoint health state from probe results
//! - Stop promptly on shutdown without cutting a probe short

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::endpoint::{Endpoint, EndpointRegistry};
use crate::failover::error::{ErrorClass, OperationError};
use crate::health::probe::Probe;
use crate::health::state::HealthTransition;
use crate::observability::metrics;

const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct HealthMonitor {
    registry: Arc<EndpointRegistry>,
    probe: Arc<dyn Probe>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(registry: Arc<EndpointRegistry>, probe: Arc<dyn Probe>, interval: Duration) -> Self {
        Self {
            registry,
            probe,
            // tokio intervals reject a zero period.
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Probe on a fixed interval until `shutdown` fires.
    ///
    /// The first cycle starts one interval after the call; use
    /// [`probe_all`](Self::probe_all) for an immediate check.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            endpoints = self.registry.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.check_all(Some(&mut shutdown)).await {
                        break;
                    }
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        tracing::info!("Health monitor stopped");
    }

    /// Run one probe cycle over every endpoint.
    pub async fn probe_all(&self) {
        self.check_all(None).await;
    }

    /// Returns `false` if shutdown was observed between endpoints.
    async fn check_all(&self, mut shutdown: Option<&mut broadcast::Receiver<()>>) -> bool {
        for endpoint in self.registry.all() {
            if let Some(rx) = shutdown.as_deref_mut() {
                if !matches!(rx.try_recv(), Err(TryRecvError::Empty)) {
                    tracing::debug!("Shutdown observed mid-cycle, skipping remaining probes");
                    return false;
                }
            }
            self.check(&endpoint).await;
        }
        true
    }

    async fn check(&self, endpoint: &Arc<Endpoint>) {
        let timeout = endpoint.config().timeout();
        let started = Instant::now();

        let probe = time::timeout(timeout, self.probe.probe(endpoint));
        let result = match AssertUnwindSafe(probe).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(OperationError::Timeout(timeout)),
            Err(_) => Err(OperationError::transient("health probe panicked")),
        };
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                metrics::record_probe(endpoint.name(), "healthy", elapsed);
                tracing::debug!(
                    endpoint = %endpoint.name(),
                    latency_ms = elapsed.as_secs_f64() * 1000.0,
                    "Health check passed"
                );
                if endpoint.record_success(elapsed) == HealthTransition::Recovered {
                    tracing::info!(endpoint = %endpoint.name(), "Endpoint recovered");
                    metrics::record_endpoint_recovered(endpoint.name());
                }
            }
            Err(error) if error.class() == ErrorClass::RateLimit => {
                metrics::record_probe(endpoint.name(), "rate_limited", elapsed);
                let cooldown = endpoint.record_rate_limit(error.retry_after());
                tracing::warn!(
                    endpoint = %endpoint.name(),
                    cooldown_secs = cooldown.as_secs_f64(),
                    "Health check rate limited"
                );
                metrics::record_rate_limited(endpoint.name());
            }
            Err(error) => {
                metrics::record_probe(endpoint.name(), "failed", elapsed);
                let transition = endpoint.record_failure(error.failure_status());
                tracing::warn!(
                    endpoint = %endpoint.name(),
                    error = %error,
                    "Health check failed"
                );
                if transition == HealthTransition::BecameUnhealthy {
                    tracing::warn!(endpoint = %endpoint.name(), "Endpoint marked unhealthy");
                    metrics::record_endpoint_unhealthy(endpoint.name());
                }
            }
        }
    }
}
