//! Operation and failover error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::health::state::EndpointStatus;

/// How the executor reacts to an [`OperationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Provider throttling: cool the endpoint down, no failure increment.
    RateLimit,
    /// Endpoint problem: count a failure and try the next endpoint.
    Transient,
    /// Caller problem: propagate without blaming the endpoint.
    Fatal,
}

/// Error returned by a caller operation or a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Fatal(String),
}

impl OperationError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    /// Classify opaque error text. Throttling phrases become
    /// [`RateLimited`](Self::RateLimited); everything else is transient.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_throttle_message(&message) {
            Self::rate_limited(message)
        } else {
            Self::Transient(message)
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited { .. } => ErrorClass::RateLimit,
            Self::Timeout(_) | Self::Transient(_) | Self::Malformed(_) => ErrorClass::Transient,
            Self::Fatal(_) => ErrorClass::Fatal,
        }
    }

    /// Provider-supplied cooldown hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Status recorded on the endpoint when this error counts as a failure.
    pub fn failure_status(&self) -> EndpointStatus {
        match self {
            Self::Malformed(_) => EndpointStatus::Degraded,
            Self::RateLimited { .. } => EndpointStatus::RateLimited,
            _ => EndpointStatus::Failed,
        }
    }
}

pub(crate) fn is_throttle_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
}

impl From<reqwest::Error> for OperationError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Self::rate_limited(err.to_string());
            }
            if status.is_client_error() {
                return Self::Fatal(err.to_string());
            }
            return Self::Transient(err.to_string());
        }

        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            // Timeouts, connection resets and request build failures.
            Self::Transient(err.to_string())
        }
    }
}

/// Why one endpoint was left behind during a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The endpoint's request window was full; nothing was sent.
    Throttled,
    Failed(OperationError),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Throttled => write!(f, "request window full"),
            AttemptFailure::Failed(err) => write!(f, "{}", err),
        }
    }
}

/// One endpoint tried during a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub endpoint: String,
    pub failure: AttemptFailure,
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.failure)
    }
}

/// Error returned by [`FailoverExecutor::execute`](super::FailoverExecutor::execute).
#[derive(Debug, Error)]
pub enum FailoverError {
    #[error("no available endpoint for '{operation}' after {count} attempt(s)", count = .attempts.len())]
    NoAvailableEndpoint {
        operation: String,
        attempts: Vec<AttemptRecord>,
    },

    #[error("'{endpoint}' rejected the operation: {source}")]
    Operation {
        endpoint: String,
        #[source]
        source: OperationError,
    },
}

impl FailoverError {
    /// Attempts made before the call gave up. Empty for fatal errors.
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            FailoverError::NoAvailableEndpoint { attempts, .. } => attempts,
            FailoverError::Operation { .. } => &[],
        }
    }
}
