//! Health probes.
//!
//! # Responsibilities
//! - Define the probe seam used by the health monitor
//! - Provide the default JSON-RPC probe against an endpoint's primary URL
//! - Classify probe responses into healthy, throttled, or failed

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::endpoint::Endpoint;
use crate::failover::error::{is_throttle_message, OperationError};
use crate::health::state::MAX_COOLDOWN;

/// Checks whether an endpoint is serving requests.
///
/// `Ok(())` means healthy. Errors are classified like operation errors:
/// [`OperationError::RateLimited`] starts a cooldown, anything else counts as
/// a failure. The monitor bounds every probe with the endpoint's timeout.
pub trait Probe: Send + Sync + 'static {
    fn probe<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<(), OperationError>>;
}

/// Probe issuing a single JSON-RPC call to the endpoint's HTTP URL.
#[derive(Debug, Clone)]
pub struct JsonRpcProbe {
    client: reqwest::Client,
    method: String,
}

impl JsonRpcProbe {
    pub fn new(method: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rpc-failover/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, method))
    }

    pub fn with_client(client: reqwest::Client, method: impl Into<String>) -> Self {
        Self {
            client,
            method: method.into(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    async fn check(&self, endpoint: &Endpoint) -> Result<(), OperationError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": self.method,
        });

        let response = self
            .client
            .post(endpoint.http_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            return Err(OperationError::RateLimited {
                message: format!("HTTP {}", status),
                retry_after,
            });
        }
        if !status.is_success() {
            return Err(OperationError::Transient(format!("HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| OperationError::Malformed(e.to_string()))?;
        classify_response(&body)
    }
}

impl Probe for JsonRpcProbe {
    fn probe<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<(), OperationError>> {
        Box::pin(self.check(endpoint))
    }
}

/// Classify a decoded JSON-RPC response body.
pub fn classify_response(body: &Value) -> Result<(), OperationError> {
    if body.get("result").is_some() {
        return Ok(());
    }

    match body.get("error") {
        Some(error) => {
            let text = error.to_string();
            if is_throttle_message(&text) {
                Err(OperationError::rate_limited(text))
            } else {
                Err(OperationError::Malformed(format!("JSON-RPC error: {}", text)))
            }
        }
        None => Err(OperationError::Malformed(
            "response has neither result nor error".to_string(),
        )),
    }
}

/// Only the delay-seconds form of `Retry-After` is honoured.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_COOLDOWN))
}
