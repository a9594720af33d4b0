//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the selected environment exists and has endpoints
//! - Validate value ranges (timeouts > 0, rates >= 1, URLs parse)
//! - Detect duplicate endpoint names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RpcConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{EndpointConfig, RpcConfig};
use crate::health::state::MAX_COOLDOWN;

const MAX_RPS: u32 = 100_000;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a full configuration.
pub fn validate_config(config: &RpcConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.active_endpoints() {
        None => errors.push(ValidationError::new(
            "environment",
            format!("unknown environment '{}'", config.environment),
        )),
        Some([]) => errors.push(ValidationError::new(
            format!("environments.{}.endpoints", config.environment),
            "no endpoints configured",
        )),
        Some(_) => {}
    }

    for (env_name, env) in &config.environments {
        let mut seen = HashSet::new();
        for (i, endpoint) in env.endpoints.iter().enumerate() {
            let prefix = format!("environments.{}.endpoints[{}]", env_name, i);
            if !seen.insert(endpoint.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("{}.name", prefix),
                    format!("duplicate endpoint name '{}'", endpoint.name),
                ));
            }
            errors.extend(endpoint_errors(&prefix, endpoint));
        }
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            "must be greater than 0",
        ));
    }

    if config.failover.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "failover.failure_threshold",
            "must be at least 1",
        ));
    }

    if config.failover.retry_max_delay_ms < config.failover.retry_base_delay_ms {
        errors.push(ValidationError::new(
            "failover.retry_max_delay_ms",
            "must not be smaller than retry_base_delay_ms",
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a single endpoint descriptor.
pub fn validate_endpoint(endpoint: &EndpointConfig) -> Result<(), Vec<ValidationError>> {
    let errors = endpoint_errors("endpoint", endpoint);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn endpoint_errors(prefix: &str, endpoint: &EndpointConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if endpoint.name.trim().is_empty() {
        errors.push(ValidationError::new(format!("{}.name", prefix), "must not be empty"));
    }

    for (field, value) in [("http", &endpoint.http_url), ("ws", &endpoint.ws_url)] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.{}", prefix, field), "URL is required"));
        } else if let Err(e) = Url::parse(value) {
            errors.push(ValidationError::new(
                format!("{}.{}", prefix, field),
                format!("invalid URL '{}': {}", value, e),
            ));
        }
    }

    if endpoint.priority < 0 {
        errors.push(ValidationError::new(
            format!("{}.priority", prefix),
            "must be >= 0",
        ));
    }

    if endpoint.max_rps == 0 || endpoint.max_rps > MAX_RPS {
        errors.push(ValidationError::new(
            format!("{}.max_rps", prefix),
            format!("must be between 1 and {}", MAX_RPS),
        ));
    }

    if !endpoint.timeout_secs.is_finite() || endpoint.timeout_secs <= 0.0 {
        errors.push(ValidationError::new(
            format!("{}.timeout", prefix),
            "must be a positive number of seconds",
        ));
    }

    if !endpoint.cooldown_secs.is_finite()
        || endpoint.cooldown_secs < 0.0
        || endpoint.cooldown_secs > MAX_COOLDOWN.as_secs_f64()
    {
        errors.push(ValidationError::new(
            format!("{}.retry_after", prefix),
            format!(
                "must be between 0 and {} seconds",
                MAX_COOLDOWN.as_secs()
            ),
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EnvironmentConfig;

    fn endpoint(name: &str) -> EndpointConfig {
        EndpointConfig::new(name, "https://rpc.example.com", "wss://rpc.example.com")
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RpcConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_endpoint_errors() {
        let mut bad = endpoint("");
        bad.http_url = String::new();
        bad.ws_url = "not a url".to_string();
        bad.priority = -1;
        bad.max_rps = 0;

        let errors = validate_endpoint(&bad).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "endpoint.name",
                "endpoint.http",
                "endpoint.ws",
                "endpoint.priority",
                "endpoint.max_rps"
            ]
        );
    }

    #[test]
    fn test_rejects_duplicates_and_unknown_environment() {
        let mut config = RpcConfig::default();
        config.environment = "testnet".to_string();
        config.environments.insert(
            "local".to_string(),
            EnvironmentConfig {
                endpoints: vec![endpoint("a"), endpoint("a")],
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "environment"));
        assert!(errors
            .iter()
            .any(|e| e.message.contains("duplicate endpoint name 'a'")));
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        let mut bad = endpoint("a");
        bad.timeout_secs = 0.0;
        bad.cooldown_secs = f64::NAN;
        let errors = validate_endpoint(&bad).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "endpoint.timeout: must be a positive number of seconds");
    }

    #[test]
    fn test_rejects_out_of_range_rate_and_cooldown() {
        let mut bad = endpoint("a");
        bad.max_rps = u32::MAX;
        bad.cooldown_secs = (u64::MAX / 2) as f64;

        let errors = validate_endpoint(&bad).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["endpoint.max_rps", "endpoint.retry_after"]);

        bad.max_rps = 100_000;
        bad.cooldown_secs = MAX_COOLDOWN.as_secs_f64();
        assert!(validate_endpoint(&bad).is_ok());
    }
}
