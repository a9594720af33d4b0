//! RPC failover daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (TOML or built-in)
//!        │
//!        ▼
//!  ┌───────────────────────────── RpcManager ─────────────────────────────┐
//!  │                                                                      │
//!  │  EndpointRegistry ◀── HealthMonitor (timer, JSON-RPC probe)          │
//!  │   │  per-endpoint state + rate window                                │
//!  │   ▼                                                                  │
//!  │  SelectionPolicy (priority, sticky) ──▶ FailoverExecutor::execute    │
//!  │                                          (admit → run → classify)    │
//!  │                                                                      │
//!  │  StatusReporter ──▶ admin API (/admin/status, /admin/endpoints)      │
//!  └──────────────────────────────────────────────────────────────────────┘
//!        │                                     │
//!        ▼                                     ▼
//!   tracing logs                         Prometheus exporter
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;

use rpc_failover::admin::{self, AdminState};
use rpc_failover::config::{load_config, RpcConfig};
use rpc_failover::lifecycle::{shutdown_signal, Shutdown};
use rpc_failover::observability::{logging, metrics};
use rpc_failover::RpcManager;

#[derive(Parser)]
#[command(name = "rpc-failover", version)]
#[command(about = "Keeps a process connected to the healthiest RPC endpoint", long_about = None)]
struct Args {
    /// TOML configuration file. Built-in public endpoints are used when omitted.
    #[arg(short, long, env = "RPC_FAILOVER_CONFIG")]
    config: Option<PathBuf>,

    /// Network environment to use, overriding the configured one
    #[arg(short, long)]
    environment: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RpcConfig::default(),
    };
    if let Some(environment) = args.environment {
        config.environment = environment;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "rpc-failover starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Validation here also covers a command-line environment override.
    let manager = Arc::new(RpcManager::from_config(&config)?);
    manager.probe_all().await;
    let summary = manager.summary();
    tracing::info!(
        available = summary.available_endpoints,
        total = summary.total_endpoints,
        "Initial health check complete"
    );
    if summary.available_endpoints == 0 {
        tracing::warn!("No endpoint is currently available; calls will fail until one recovers");
    }

    manager.start_health_monitoring();

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(manager.clone(), config.admin.api_key.as_str());
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, rx).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }));
    }

    if config.observability.summary_interval_secs > 0 {
        let period = Duration::from_secs(config.observability.summary_interval_secs);
        tasks.push(tokio::spawn(log_summaries(
            manager.clone(),
            period,
            shutdown.subscribe(),
        )));
    }

    shutdown_signal().await;

    shutdown.trigger();
    manager.stop_health_monitoring().await;
    for task in tasks {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn log_summaries(
    manager: Arc<RpcManager>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = manager.summary();
                tracing::info!(
                    current_endpoint = summary.current_endpoint.as_deref().unwrap_or("none"),
                    available = summary.available_endpoints,
                    total = summary.total_endpoints,
                    failovers = summary.failover_count,
                    fatal_errors = summary.fatal_error_count,
                    "RPC status"
                );
            }
            _ = shutdown.recv() => break,
        }
    }
}
