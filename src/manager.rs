//! RPC manager facade.
//!
//! # Responsibilities
//! - Own one registry, selection policy, executor, reporter and monitor
//! - Build itself from a validated configuration
//! - Start and stop background health monitoring

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{
    validate_config, ConfigError, EndpointConfig, FailoverConfig, HealthCheckConfig, RpcConfig,
};
use crate::endpoint::{Endpoint, EndpointRegistry, RegistryError};
use crate::failover::{FailoverError, FailoverExecutor, OperationError};
use crate::health::{HealthMonitor, JsonRpcProbe, Probe};
use crate::lifecycle::Shutdown;
use crate::selection::SelectionPolicy;
use crate::status::{ManagerStats, StatusReporter, StatusSummary};

/// Errors raised while building a manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to build health probe client: {0}")]
    Client(#[from] reqwest::Error),
}

struct MonitorTask {
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// Keeps a process connected to the best available RPC endpoint.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct RpcManager {
    registry: Arc<EndpointRegistry>,
    policy: Arc<SelectionPolicy>,
    stats: Arc<ManagerStats>,
    executor: FailoverExecutor,
    reporter: StatusReporter,
    probe: Arc<dyn Probe>,
    health: HealthCheckConfig,
    monitor: Mutex<Option<MonitorTask>>,
}

impl RpcManager {
    /// Empty manager using the default JSON-RPC probe.
    pub fn new(health: HealthCheckConfig, failover: FailoverConfig) -> Result<Self, ManagerError> {
        let probe = JsonRpcProbe::new(health.probe_method.clone())?;
        Ok(Self::with_probe(health, failover, Arc::new(probe)))
    }

    /// Empty manager using a custom probe.
    pub fn with_probe(
        health: HealthCheckConfig,
        failover: FailoverConfig,
        probe: Arc<dyn Probe>,
    ) -> Self {
        let registry = Arc::new(EndpointRegistry::new(failover.failure_threshold));
        let policy = Arc::new(SelectionPolicy::new(failover.selection));
        let stats = Arc::new(ManagerStats::default());
        let executor =
            FailoverExecutor::new(registry.clone(), policy.clone(), stats.clone(), &failover);
        let reporter = StatusReporter::new(registry.clone(), policy.clone(), stats.clone());

        Self {
            registry,
            policy,
            stats,
            executor,
            reporter,
            probe,
            health,
            monitor: Mutex::new(None),
        }
    }

    /// Validate `config` and register the active environment's endpoints.
    pub fn from_config(config: &RpcConfig) -> Result<Self, ManagerError> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let manager = Self::new(config.health_check.clone(), config.failover.clone())?;
        manager.register_all(config.active_endpoints().unwrap_or_default().to_vec())?;

        tracing::info!(
            environment = %config.environment,
            endpoints = manager.registry.len(),
            selection = ?config.failover.selection,
            "RPC manager initialized"
        );
        Ok(manager)
    }

    pub fn register(&self, config: EndpointConfig) -> Result<Arc<Endpoint>, RegistryError> {
        self.registry.register(config)
    }

    pub fn register_all(
        &self,
        configs: Vec<EndpointConfig>,
    ) -> Result<Vec<Arc<Endpoint>>, RegistryError> {
        self.registry.register_all(configs)
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &Arc<SelectionPolicy> {
        &self.policy
    }

    pub fn stats(&self) -> &Arc<ManagerStats> {
        &self.stats
    }

    fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(
            self.registry.clone(),
            self.probe.clone(),
            self.health.interval(),
        )
    }

    /// Start the background monitor. Calling it again while running is a no-op.
    ///
    /// Returns `true` if a new monitor task was spawned. Requires a tokio runtime.
    pub fn start_health_monitoring(&self) -> bool {
        if !self.health.enabled {
            tracing::info!("Active health checks disabled");
            return false;
        }

        let mut slot = self.monitor.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.as_ref() {
            if !task.handle.is_finished() {
                tracing::debug!("Health monitor already running");
                return false;
            }
        }

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(self.health_monitor().run(shutdown.subscribe()));
        *slot = Some(MonitorTask { shutdown, handle });
        true
    }

    /// Stop the background monitor and wait for it to exit. No-op if not running.
    pub async fn stop_health_monitoring(&self) {
        let task = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            task.shutdown.trigger();
            if let Err(e) = task.handle.await {
                tracing::error!(error = %e, "Health monitor task ended abnormally");
            }
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Probe every endpoint once, now.
    pub async fn probe_all(&self) {
        self.health_monitor().probe_all().await;
    }

    /// Run `operation` against the best available endpoint, failing over on error.
    pub async fn execute<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, FailoverError>
    where
        F: FnMut(Arc<Endpoint>) -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        self.executor.execute(operation, op).await
    }

    /// Endpoint that served the last successful call.
    pub fn current_endpoint(&self) -> Option<Arc<Endpoint>> {
        self.policy.current()
    }

    pub fn summary(&self) -> StatusSummary {
        self.reporter.summary()
    }
}

impl Drop for RpcManager {
    fn drop(&mut self) {
        let task = self
            .monitor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.shutdown.trigger();
        }
    }
}
