//! Endpoint registry.
//!
//! # Responsibilities
//! - Validate and register endpoint descriptors
//! - Keep endpoints in priority order for selection
//! - Provide lock-free snapshots of the endpoint list

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::{validate_endpoint, EndpointConfig};
use crate::endpoint::Endpoint;
use crate::observability::metrics;

/// Errors raised while registering endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Descriptor is malformed or its name is already taken.
    #[error("invalid endpoint '{name}': {reason}")]
    InvalidEndpoint { name: String, reason: String },
}

/// Holds every known endpoint, ordered by priority (descending).
#[derive(Debug)]
pub struct EndpointRegistry {
    endpoints: ArcSwap<Vec<Arc<Endpoint>>>,
    failure_threshold: u32,
    /// Serializes writers; readers go through the ArcSwap snapshot.
    write_lock: Mutex<()>,
}

impl EndpointRegistry {
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            endpoints: ArcSwap::from_pointee(Vec::new()),
            failure_threshold: failure_threshold.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Validate and register one endpoint.
    pub fn register(&self, config: EndpointConfig) -> Result<Arc<Endpoint>, RegistryError> {
        if let Err(errors) = validate_endpoint(&config) {
            let reason = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(RegistryError::InvalidEndpoint {
                name: config.name,
                reason,
            });
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.endpoints.load_full();
        if current.iter().any(|e| e.name() == config.name) {
            return Err(RegistryError::InvalidEndpoint {
                reason: "duplicate endpoint name".to_string(),
                name: config.name,
            });
        }

        let endpoint = Arc::new(Endpoint::new(config, self.failure_threshold));
        let mut next = current.to_vec();
        // Insert after all endpoints of equal or higher priority.
        let index = next.partition_point(|e| e.priority() >= endpoint.priority());
        next.insert(index, endpoint.clone());
        self.endpoints.store(Arc::new(next));

        tracing::info!(
            endpoint = %endpoint.name(),
            priority = endpoint.priority(),
            max_rps = endpoint.config().max_rps,
            timeout_secs = endpoint.config().timeout_secs,
            "Registered RPC endpoint"
        );
        metrics::record_endpoint_registered(endpoint.name());

        Ok(endpoint)
    }

    /// Register several endpoints, stopping at the first invalid one.
    pub fn register_all<I>(&self, configs: I) -> Result<Vec<Arc<Endpoint>>, RegistryError>
    where
        I: IntoIterator<Item = EndpointConfig>,
    {
        configs.into_iter().map(|c| self.register(c)).collect()
    }

    /// Every registered endpoint, priority order.
    pub fn all(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints.load_full().to_vec()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints
            .load()
            .iter()
            .find(|e| e.name() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.endpoints.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently eligible endpoints: priority descending, then lowest observed
    /// latency. Endpoints without a latency sample sort after measured ones.
    pub fn available(&self) -> Vec<Arc<Endpoint>> {
        self.available_at(Instant::now())
    }

    pub fn available_at(&self, now: Instant) -> Vec<Arc<Endpoint>> {
        let mut available: Vec<(Arc<Endpoint>, Duration)> = self
            .endpoints
            .load()
            .iter()
            .filter(|e| e.is_available_at(now))
            .map(|e| (e.clone(), e.last_latency().unwrap_or(Duration::MAX)))
            .collect();

        // Stable sort keeps registration order for full ties.
        available.sort_by(|(a, a_latency), (b, b_latency)| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a_latency.cmp(b_latency))
        });
        available.into_iter().map(|(e, _)| e).collect()
    }
}
