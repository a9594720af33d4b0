//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the failover
//! manager. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::defaults::default_environments;

/// Root configuration for the RPC failover manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Network environment whose endpoints are registered (e.g. "mainnet").
    pub environment: String,

    /// Endpoint descriptors grouped by network environment.
    pub environments: BTreeMap<String, EnvironmentConfig>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Failover and selection settings.
    pub failover: FailoverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin status API settings.
    pub admin: AdminConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            environment: "mainnet".to_string(),
            environments: default_environments(),
            health_check: HealthCheckConfig::default(),
            failover: FailoverConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl RpcConfig {
    /// Endpoints of the selected environment, in declaration order.
    pub fn active_endpoints(&self) -> Option<&[EndpointConfig]> {
        self.environments
            .get(&self.environment)
            .map(|env| env.endpoints.as_slice())
    }
}

/// Endpoints of one network environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// A single RPC provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Unique endpoint identifier.
    pub name: String,

    /// Primary (HTTP JSON-RPC) URL.
    #[serde(rename = "http")]
    pub http_url: String,

    /// Secondary (WebSocket streaming) URL.
    #[serde(rename = "ws")]
    pub ws_url: String,

    /// Selection priority (higher = preferred).
    #[serde(default)]
    pub priority: i64,

    /// Maximum requests admitted in any trailing one-second window.
    #[serde(default = "default_max_rps")]
    pub max_rps: u32,

    /// Per-call timeout in seconds.
    #[serde(rename = "timeout", default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Cooldown applied after the provider signals throttling, in seconds.
    #[serde(rename = "retry_after", default = "default_cooldown_secs")]
    pub cooldown_secs: f64,
}

fn default_max_rps() -> u32 {
    100
}

fn default_timeout_secs() -> f64 {
    5.0
}

fn default_cooldown_secs() -> f64 {
    60.0
}

impl EndpointConfig {
    /// Create an endpoint descriptor with default limits.
    pub fn new(
        name: impl Into<String>,
        http_url: impl Into<String>,
        ws_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            http_url: http_url.into(),
            ws_url: ws_url.into(),
            priority: 0,
            max_rps: default_max_rps(),
            timeout_secs: default_timeout_secs(),
            cooldown_secs: default_cooldown_secs(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_rps(mut self, max_rps: u32) -> Self {
        self.max_rps = max_rps;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_secs = cooldown.as_secs_f64();
        self
    }

    /// Per-call timeout. Falls back to the default for unrepresentable values.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout_secs()))
    }

    /// Rate-limit cooldown. Falls back to the default for unrepresentable values.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_cooldown_secs()))
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background health monitor.
    pub enabled: bool,

    /// Probe cycle interval in seconds.
    pub interval_secs: u64,

    /// JSON-RPC method sent by the probe.
    pub probe_method: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            probe_method: "getBlockProduction".to_string(),
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Endpoint selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Keep using the last successful endpoint while it stays available.
    #[default]
    Sticky,
    /// Always pick the highest-priority available endpoint.
    PreferHighest,
}

/// Failover configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Consecutive failures after which an endpoint becomes unavailable.
    pub failure_threshold: u32,

    /// Selection strategy.
    pub selection: SelectionMode,

    /// Base delay before trying the next endpoint, in milliseconds (0 disables).
    pub retry_base_delay_ms: u64,

    /// Maximum delay between failover attempts, in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            selection: SelectionMode::Sticky,
            retry_base_delay_ms: 0,
            retry_max_delay_ms: 1000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Interval for the daemon's periodic status log line, in seconds (0 disables).
    pub summary_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            summary_interval_secs: 60,
        }
    }
}

/// Admin status API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
